use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::GlowbitError;

/// A single 24-bit pixel colour, stored before any brightness scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const CYAN: Rgb = Rgb::new(0, 255, 255);
    pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);
    pub const ORANGE: Rgb = Rgb::new(255, 128, 0);
    pub const PURPLE: Rgb = Rgb::new(128, 0, 255);
    pub const PINK: Rgb = Rgb::new(255, 96, 160);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB`, `#RGB` or one of the named lesson colours.
    pub fn parse(text: &str) -> Result<Self, GlowbitError> {
        let trimmed = text.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| GlowbitError::InvalidColor(text.to_string()));
        }

        let named = match trimmed.to_ascii_lowercase().as_str() {
            "black" | "off" => Rgb::BLACK,
            "white" => Rgb::WHITE,
            "red" => Rgb::RED,
            "green" => Rgb::GREEN,
            "blue" => Rgb::BLUE,
            "yellow" => Rgb::YELLOW,
            "cyan" => Rgb::CYAN,
            "magenta" => Rgb::MAGENTA,
            "orange" => Rgb::ORANGE,
            "purple" => Rgb::PURPLE,
            "pink" => Rgb::PINK,
            _ => return Err(GlowbitError::InvalidColor(text.to_string())),
        };
        Ok(named)
    }

    /// Applies a global 0-255 brightness to every channel.
    pub fn scaled(self, brightness: u8) -> Self {
        let scale = |channel: u8| ((channel as u16 * brightness as u16) / 255) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    pub fn is_black(self) -> bool {
        self == Rgb::BLACK
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
            Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
        }
        3 => {
            let channel = |at: usize| u8::from_str_radix(&hex[at..at + 1], 16).ok().map(|v| v * 17);
            Some(Rgb::new(channel(0)?, channel(1)?, channel(2)?))
        }
        _ => None,
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = GlowbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgb::parse(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = GlowbitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(Rgb::parse("#00FF00").unwrap(), Rgb::GREEN);
        assert_eq!(Rgb::parse("#0f0").unwrap(), Rgb::GREEN);
        assert_eq!(Rgb::parse(" #123456 ").unwrap(), Rgb::new(0x12, 0x34, 0x56));
    }

    #[test]
    fn parses_named_colours_case_insensitively() {
        assert_eq!(Rgb::parse("Red").unwrap(), Rgb::RED);
        assert_eq!(Rgb::parse("off").unwrap(), Rgb::BLACK);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Rgb::parse("#12345").is_err());
        assert!(Rgb::parse("#GGGGGG").is_err());
        let err = Rgb::parse("chartreuse").unwrap_err();
        assert!(format!("{err}").contains("chartreuse"));
    }

    #[test]
    fn brightness_scales_channels() {
        assert_eq!(Rgb::GREEN.scaled(255), Rgb::GREEN);
        assert_eq!(Rgb::GREEN.scaled(0), Rgb::BLACK);
        assert_eq!(Rgb::new(200, 100, 50).scaled(128), Rgb::new(100, 50, 25));
    }

    #[test]
    fn serialises_as_hex_string() {
        let json = serde_json::to_string(&Rgb::new(1, 2, 255)).unwrap();
        assert_eq!(json, "\"#0102FF\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb::new(1, 2, 255));
    }
}
