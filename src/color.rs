use std::fmt;

/// 8-bit RGBA color. Persisted as `#AARRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const OPAQUE_WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const CLEAR_WHITE: Rgba = Rgba::new(255, 255, 255, 0);
    pub const OPAQUE_BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Accepts `#AARRGGBB` or `#RRGGBB` (opaque), with or without `#`.
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

        match hex.len() {
            6 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::new(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
            _ => None,
        }
    }

    /// Packed the way the shell accent policy expects: `A<<24 | B<<16 | G<<8 | R`.
    pub fn to_abgr(self) -> u32 {
        (self.a as u32) << 24 | (self.b as u32) << 16 | (self.g as u32) << 8 | self.r as u32
    }

    pub fn to_css(self) -> String {
        format!(
            "rgba({}, {}, {}, {:.3})",
            self.r,
            self.g,
            self.b,
            self.a as f32 / 255.0
        )
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_argb_and_rgb_forms() {
        assert_eq!(Rgba::parse("#80102030"), Some(Rgba::new(0x10, 0x20, 0x30, 0x80)));
        assert_eq!(Rgba::parse("102030"), Some(Rgba::new(0x10, 0x20, 0x30, 255)));
        assert_eq!(Rgba::parse("#12345"), None);
        assert_eq!(Rgba::parse("#GG000000"), None);
        assert_eq!(Rgba::parse("#+1+2+3+4"), None);
        assert_eq!(Rgba::parse("-1-2-3"), None);
    }

    #[test]
    fn display_is_parseable() {
        let c = Rgba::new(1, 2, 3, 4);
        assert_eq!(c.to_string(), "#04010203");
        assert_eq!(Rgba::parse(&c.to_string()), Some(c));
    }

    #[test]
    fn accent_packing_puts_red_in_low_byte() {
        assert_eq!(Rgba::new(0x11, 0x22, 0x33, 0x44).to_abgr(), 0x4433_2211);
        assert_eq!(Rgba::CLEAR_WHITE.to_abgr(), 0x00FF_FFFF);
    }

    #[test]
    fn css_alpha_is_normalized() {
        assert_eq!(Rgba::OPAQUE_BLACK.to_css(), "rgba(0, 0, 0, 1.000)");
    }
}
