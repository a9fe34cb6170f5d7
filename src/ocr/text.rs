pub(super) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Joins fragment texts with a single space, in the order given.
pub(super) fn join_fragments<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(part);
    }
    joined
}
