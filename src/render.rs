use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::GenericImageView;

use crate::fit::{FitMode, FontSizeRange, TextMeasure};
use crate::ocr::RecognizedFragment;
use crate::settings::Settings;

const LINE_HEIGHT: f64 = 1.2;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub text_color: String,
    pub fill_color: String,
    pub font_family: Option<String>,
    pub font_range: FontSizeRange,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            text_color: "#000000".to_string(),
            fill_color: "#ffffff".to_string(),
            font_family: None,
            font_range: FontSizeRange::default(),
        }
    }
}

impl OverlayStyle {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            text_color: settings.overlay_text_color.clone(),
            fill_color: settings.overlay_fill_color.clone(),
            font_family: settings.overlay_font_family.clone(),
            font_range: settings.font_range(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Sniffs the mime type and decodes the dimensions of a captured image.
pub fn inspect_image(bytes: &[u8]) -> Result<ImageInfo> {
    let mime = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .filter(|mime| mime.starts_with("image/"))
        .ok_or_else(|| anyhow!("unable to detect image mime type"))?;
    let image = image::load_from_memory(bytes).with_context(|| "failed to decode image")?;
    let (width, height) = image.dimensions();
    Ok(ImageInfo {
        mime,
        width,
        height,
    })
}

/// Draws translated fragments over the captured image.
///
/// Fragments are in image pixel space. Each one gets an opaque box over its
/// source area with the text centered inside, sized by the precise fit.
pub fn render_svg(
    image_bytes: &[u8],
    image_mime: &str,
    width: u32,
    height: u32,
    fragments: &[RecognizedFragment],
    style: &OverlayStyle,
    measure: &dyn TextMeasure,
) -> Result<String> {
    if width == 0 || height == 0 {
        return Err(anyhow!("cannot render an empty image ({}x{})", width, height));
    }
    let encoded = BASE64.encode(image_bytes);
    let data_uri = format!("data:{};base64,{}", image_mime, encoded);

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    let strategy = FitMode::Precise.strategy();
    let family_attr = style
        .font_family
        .as_deref()
        .map(|family| format!(r#" font-family="{}""#, escape_xml(family)))
        .unwrap_or_default();

    for fragment in fragments {
        if fragment.text.trim().is_empty() {
            continue;
        }
        let Some(bounds) = fragment.bounds() else {
            continue;
        };
        let fitted = strategy.fit(&fragment.text, &bounds, style.font_range, measure);

        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}"/>"#,
            x = bounds.left,
            y = bounds.top,
            w = bounds.width,
            h = bounds.height,
            fill = escape_xml(&style.fill_color)
        ));

        let (center_x, center_y) = bounds.center();
        let lines = fitted.text.split('\n').collect::<Vec<_>>();
        let line_height = fitted.font_size * LINE_HEIGHT;
        let first_y = center_y - (lines.len() as f64 - 1.0) * line_height / 2.0;
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}"{family} text-anchor="middle" dominant-baseline="central">"#,
            x = center_x,
            y = first_y,
            size = fitted.font_size,
            color = escape_xml(&style.text_color),
            family = family_attr
        ));
        for (idx, line) in lines.iter().enumerate() {
            let escaped = escape_xml(line);
            if idx == 0 {
                svg.push_str(&escaped);
            } else {
                svg.push_str(&format!(
                    r#"<tspan x="{x}" dy="{dy}">{text}</tspan>"#,
                    x = center_x,
                    dy = line_height,
                    text = escaped
                ));
            }
        }
        svg.push_str("</text>");
    }

    svg.push_str("</svg>");
    Ok(svg)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{ELLIPSIS, TextExtent};

    struct FixedMeasure;

    impl TextMeasure for FixedMeasure {
        fn measure(&self, text: &str, font_size: f64) -> TextExtent {
            TextExtent {
                width: text.chars().count() as f64 * font_size * 0.5,
                height: font_size,
            }
        }
    }

    #[test]
    fn draws_background_box_and_centered_text() {
        let fragments = vec![RecognizedFragment::from_corners("Tom & Jerry", 10, 20, 110, 40)];
        let svg = render_svg(
            b"png",
            "image/png",
            200,
            100,
            &fragments,
            &OverlayStyle::default(),
            &FixedMeasure,
        )
        .expect("svg");

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(&format!("data:image/png;base64,{}", BASE64.encode(b"png"))));
        assert!(svg.contains(r##"<rect x="10" y="20" width="100" height="20" fill="#ffffff"/>"##));
        assert!(svg.contains(r#"x="60" y="30""#));
        assert!(svg.contains("Tom &amp; Jerry"));
    }

    #[test]
    fn overflowing_text_is_truncated() {
        let long = "a".repeat(200);
        let fragments = vec![RecognizedFragment::from_corners(long.as_str(), 0, 0, 40, 10)];
        let svg = render_svg(
            b"",
            "image/png",
            50,
            50,
            &fragments,
            &OverlayStyle::default(),
            &FixedMeasure,
        )
        .expect("svg");
        assert!(svg.contains(ELLIPSIS));
        assert!(!svg.contains(&long));
    }

    #[test]
    fn skips_fragments_without_geometry() {
        let fragments = vec![
            RecognizedFragment::new("floating", Vec::new()),
            RecognizedFragment::from_corners("   ", 0, 0, 10, 10),
        ];
        let svg = render_svg(
            b"",
            "image/png",
            10,
            10,
            &fragments,
            &OverlayStyle::default(),
            &FixedMeasure,
        )
        .expect("svg");
        assert!(!svg.contains("<rect"));
        assert!(!svg.contains("<text"));
    }

    #[test]
    fn font_family_and_colors_are_escaped() {
        let style = OverlayStyle {
            text_color: "#112233".to_string(),
            fill_color: "#445566".to_string(),
            font_family: Some("\"Odd\" Sans".to_string()),
            font_range: FontSizeRange::new(8.0, 12.0),
        };
        let fragments = vec![RecognizedFragment::from_corners("hi", 0, 0, 100, 40)];
        let svg = render_svg(b"", "image/png", 100, 40, &fragments, &style, &FixedMeasure)
            .expect("svg");
        assert!(svg.contains(r#"font-family="&quot;Odd&quot; Sans""#));
        assert!(svg.contains(r##"fill="#112233""##));
        assert!(svg.contains(r#"font-size="12""#));
    }

    #[test]
    fn empty_canvas_is_rejected() {
        let err = render_svg(b"", "image/png", 0, 10, &[], &OverlayStyle::default(), &FixedMeasure)
            .expect_err("empty");
        assert!(err.to_string().contains("empty image"));
    }

    #[test]
    fn inspect_image_rejects_non_images() {
        assert!(inspect_image(b"plain text").is_err());
    }
}
