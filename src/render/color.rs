//! Hex color parsing and srgb-to-linear conversion for tints and captions.

use tracing::warn;

/// Accepts `#rgb`, `#rgba`, `#rrggbb`, and `#rrggbbaa` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Option<[f32; 4]> {
    let hex = value.trim().trim_start_matches('#');
    match hex.len() {
        3 | 4 => {
            let mut out = [0.0f32; 4];
            out[3] = 1.0;
            for (i, ch) in hex.chars().enumerate() {
                let nibble = u8::from_str_radix(&ch.to_string(), 16).ok()?;
                out[i] = (nibble * 17) as f32 / 255.0;
            }
            Some(out)
        }
        6 | 8 => {
            let mut out = [0.0f32; 4];
            out[3] = 1.0;
            for i in 0..hex.len() / 2 {
                let byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).ok()?;
                out[i] = byte as f32 / 255.0;
            }
            Some(out)
        }
        _ => None,
    }
}

/// Parse with a warning and fallback so a typo in the config degrades the
/// palette instead of killing the gallery.
pub fn parse_color_or(value: &str, fallback: [f32; 4]) -> [f32; 4] {
    match parse_hex_color(value) {
        Some(color) => color,
        None => {
            warn!(value, "unparseable color; using fallback");
            fallback
        }
    }
}

pub fn srgb_to_linear_rgba(color: [f32; 4]) -> [f32; 4] {
    [
        srgb_to_linear(color[0]),
        srgb_to_linear(color[1]),
        srgb_to_linear(color[2]),
        color[3],
    ]
}

fn srgb_to_linear(component: f32) -> f32 {
    if component <= 0.04045 {
        component / 12.92
    } else {
        ((component + 0.055) / 1.055).powf(2.4)
    }
}

/// 8-bit srgb triple for CPU-side pixel generation.
pub fn to_rgb8(color: [f32; 4]) -> [u8; 3] {
    [
        (color[0] * 255.0).round().clamp(0.0, 255.0) as u8,
        (color[1] * 255.0).round().clamp(0.0, 255.0) as u8,
        (color[2] * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}
