//! Lightweight CSS property extraction.
//!
//! Parses inline `style=""` attributes and extracts the few geometric
//! properties the block layout honours.

/// Extracted CSS geometry properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleProps {
    pub height: Option<f32>,
    pub padding_top: Option<f32>,
    pub scroll_padding_top: Option<f32>,
    pub hidden: bool,
}

/// Parse an inline `style="..."` attribute value.
pub fn parse_inline_style(style: &str) -> StyleProps {
    let mut props = StyleProps::default();
    for decl in style.split(';') {
        let parts: Vec<&str> = decl.splitn(2, ':').collect();
        if parts.len() != 2 {
            continue;
        }
        let prop = parts[0].trim().to_ascii_lowercase();
        let val = parts[1].trim();
        match prop.as_str() {
            "height" | "min-height" => props.height = parse_css_size(val),
            "padding-top" => props.padding_top = parse_css_size(val),
            "scroll-padding-top" => props.scroll_padding_top = parse_css_size(val),
            "display" => props.hidden = val.eq_ignore_ascii_case("none"),
            _ => {}
        }
    }
    props
}

/// Parse a CSS size value (px or plain number).
fn parse_css_size(val: &str) -> Option<f32> {
    let v = val.trim().to_lowercase();
    let num_str = v.trim_end_matches("px");
    num_str.trim().parse::<f32>().ok().filter(|n| n.is_finite() && *n >= 0.0)
}
