use std::cmp::Ordering;

use tracing::debug;

use super::geom::is_adjacent;
use super::text::{is_blank, join_fragments};
use super::{RecognizedFragment, Rect};

struct Placed {
    fragment: RecognizedFragment,
    rect: Rect,
}

/// Merges fragments that sit on the same text line next to each other.
///
/// Fragments are scanned in top-then-left order; each unconsumed fragment
/// seeds a group that keeps absorbing later adjacent fragments (tested
/// against the group's running union) until nothing else qualifies. Whole
/// passes repeat until one merges nothing, so merging the output again is a
/// no-op. Input is returned untouched when any fragment has no shape data.
pub fn merge_fragments(fragments: Vec<RecognizedFragment>) -> Vec<RecognizedFragment> {
    if fragments.iter().any(|fragment| !fragment.has_geometry()) {
        debug!("layout merge skipped: fragment without geometry");
        return fragments;
    }

    let input_len = fragments.len();
    let mut placed: Vec<Placed> = fragments
        .into_iter()
        .filter(|fragment| !is_blank(&fragment.text))
        .filter_map(|fragment| {
            let rect = fragment.bounds()?;
            Some(Placed { fragment, rect })
        })
        .collect();

    let mut passes = 0usize;
    loop {
        passes += 1;
        let before = placed.len();
        placed = merge_pass(placed);
        if placed.len() == before {
            break;
        }
    }

    debug!(
        input = input_len,
        output = placed.len(),
        passes,
        "layout merge done"
    );
    placed.into_iter().map(|entry| entry.fragment).collect()
}

fn merge_pass(mut placed: Vec<Placed>) -> Vec<Placed> {
    placed.sort_by(|a, b| {
        a.rect
            .top
            .partial_cmp(&b.rect.top)
            .unwrap_or(Ordering::Equal)
            .then(
                a.rect
                    .left
                    .partial_cmp(&b.rect.left)
                    .unwrap_or(Ordering::Equal),
            )
    });

    let mut used = vec![false; placed.len()];
    let mut merged = Vec::with_capacity(placed.len());
    for seed in 0..placed.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let mut group = vec![seed];
        let mut union = placed[seed].rect;

        loop {
            let mut absorbed = false;
            for candidate in (seed + 1)..placed.len() {
                if used[candidate] || !is_adjacent(&union, &placed[candidate].rect) {
                    continue;
                }
                used[candidate] = true;
                union = union.union(&placed[candidate].rect);
                group.push(candidate);
                absorbed = true;
            }
            if !absorbed {
                break;
            }
        }

        if group.len() == 1 {
            merged.push(Placed {
                fragment: placed[seed].fragment.clone(),
                rect: placed[seed].rect,
            });
            continue;
        }
        let text = join_fragments(group.iter().map(|&idx| placed[idx].fragment.text.as_str()));
        merged.push(Placed {
            fragment: RecognizedFragment::new(text, union.corner_points()),
            rect: union,
        });
    }
    merged
}
