//! Color value parsing for `color` edits.

/// Named colors accepted in addition to hex notation, as 8-bit RGB.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("white", [255, 255, 255]),
    ("black", [0, 0, 0]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("red", [200, 30, 30]),
    ("green", [40, 140, 60]),
    ("blue", [30, 80, 200]),
    ("yellow", [240, 210, 60]),
    ("orange", [240, 140, 40]),
    ("purple", [120, 60, 160]),
    ("pink", [240, 160, 190]),
    ("brown", [120, 80, 50]),
    ("navy", [20, 30, 80]),
    ("beige", [225, 210, 180]),
    ("cream", [250, 245, 225]),
    ("tan", [210, 180, 140]),
    ("olive", [110, 115, 50]),
    ("teal", [0, 128, 128]),
    ("coral", [255, 127, 80]),
    ("lavender", [200, 185, 230]),
    ("mint", [170, 230, 200]),
    ("peach", [255, 205, 170]),
    ("charcoal", [55, 60, 65]),
    ("ivory", [255, 255, 240]),
    ("sage", [160, 175, 140]),
];

/// Parse `#RRGGBB`, `#RRGGBBAA` or a named color into RGBA in `[0, 1]`.
pub fn parse_color(value: &str) -> Option<[f32; 4]> {
    let v = value.trim();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = v.to_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, [r, g, b])| [to_unit(*r), to_unit(*g), to_unit(*b), 1.0])
}

pub fn named_colors() -> impl Iterator<Item = &'static str> {
    NAMED_COLORS.iter().map(|(name, _)| *name)
}

fn parse_hex(hex: &str) -> Option<[f32; 4]> {
    if !(hex.len() == 6 || hex.len() == 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(to_unit);
    let alpha = if hex.len() == 8 { channel(6)? } else { 1.0 };
    Some([channel(0)?, channel(2)?, channel(4)?, alpha])
}

fn to_unit(c: u8) -> f32 {
    c as f32 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_rgb() {
        let c = parse_color("#112233").unwrap();
        assert!((c[0] - 17.0 / 255.0).abs() < 1e-6);
        assert!((c[2] - 51.0 / 255.0).abs() < 1e-6);
        assert_eq!(c[3], 1.0);
    }

    #[test]
    fn test_hex_rgba_and_case() {
        let c = parse_color("#FFffFF80").unwrap();
        assert_eq!(c[0], 1.0);
        assert!((c[3] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_named() {
        assert!(parse_color("Navy").is_some());
        assert!(parse_color(" lavender ").is_some());
        assert!(named_colors().count() >= 20);
    }

    #[test]
    fn test_rejects() {
        assert!(parse_color("#12345").is_none());
        assert!(parse_color("#gg0000").is_none());
        assert!(parse_color("#ééé").is_none());
        assert!(parse_color("banana").is_none());
        assert!(parse_color("").is_none());
    }
}
