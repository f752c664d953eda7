//! Plot colors as configured by the user.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const LIGHT_GRAY: Rgb = Rgb::new(0xd3, 0xd3, 0xd3);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
}

// Named colors accepted in the configuration file.
const NAMED: &[(&str, Rgb)] = &[
    ("red", Rgb::new(0xff, 0x00, 0x00)),
    ("green", Rgb::new(0x00, 0x80, 0x00)),
    ("blue", Rgb::new(0x00, 0x00, 0xff)),
    ("orange", Rgb::new(0xff, 0xa5, 0x00)),
    ("purple", Rgb::new(0x80, 0x00, 0x80)),
    ("magenta", Rgb::new(0xff, 0x00, 0xff)),
    ("cyan", Rgb::new(0x00, 0xff, 0xff)),
    ("yellow", Rgb::new(0xff, 0xff, 0x00)),
    ("brown", Rgb::new(0xa5, 0x2a, 0x2a)),
    ("black", Rgb::BLACK),
    ("white", Rgb::new(0xff, 0xff, 0xff)),
    ("gray", Rgb::new(0x80, 0x80, 0x80)),
    ("grey", Rgb::new(0x80, 0x80, 0x80)),
    ("lightgray", Rgb::LIGHT_GRAY),
    ("lightgrey", Rgb::LIGHT_GRAY),
    ("darkgray", Rgb::new(0xa9, 0xa9, 0xa9)),
    ("darkgrey", Rgb::new(0xa9, 0xa9, 0xa9)),
];

impl FromStr for Rgb {
    type Err = Error;

    /// Parses `#rrggbb`, `#rgb` or a color name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || Error::InvalidColor(s.to_string());

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(invalid());
            }
            let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
            return match hex.len() {
                6 => Ok(Rgb::new(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                )),
                3 => {
                    let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                    Ok(Rgb::new(short(0)?, short(1)?, short(2)?))
                }
                _ => Err(invalid()),
            };
        }

        let lower = trimmed.to_ascii_lowercase();
        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, rgb)| *rgb)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!("#D3D3D3".parse::<Rgb>().unwrap(), Rgb::LIGHT_GRAY);
        assert_eq!("#f00".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 0));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(" Blue ".parse::<Rgb>().unwrap(), Rgb::new(0, 0, 255));
        assert!("chartreuse-ish".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let c = Rgb::new(0x12, 0xab, 0x00);
        assert_eq!(c.to_string(), "#12ab00");
        assert_eq!(c.to_string().parse::<Rgb>().unwrap(), c);
    }
}
