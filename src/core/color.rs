/*
 * Defines the RGBA color used by every taskbar appearance. Colors are stored
 * in settings as `#RRGGBBAA` strings so the file stays hand-editable; the
 * six-digit form is accepted on input and treated as fully opaque.
 */
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid color '{}': expected #RRGGBB or #RRGGBBAA",
            self.0
        )
    }
}

impl std::error::Error for ColorParseError {}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub fn parse(text: &str) -> Result<Self, ColorParseError> {
        let hex = text.strip_prefix('#').unwrap_or(text);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError(text.to_string()));
        }

        let channel = |index: usize| {
            u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16)
                .map_err(|_| ColorParseError(text.to_string()))
        };

        let a = if hex.len() == 8 { channel(3)? } else { 0xFF };
        Ok(Color {
            r: channel(0)?,
            g: channel(1)?,
            b: channel(2)?,
            a,
        })
    }

    /*
     * Packs the color as 0xAABBGGRR, the layout the composition accent policy
     * expects for its gradient color.
     */
    pub fn to_abgr(self) -> u32 {
        (u32::from(self.a) << 24)
            | (u32::from(self.b) << 16)
            | (u32::from(self.g) << 8)
            | u32::from(self.r)
    }

    /// COLORREF layout (0x00BBGGRR), alpha dropped.
    pub fn to_colorref(self) -> u32 {
        self.to_abgr() & 0x00FF_FFFF
    }

    pub fn from_colorref(value: u32, alpha: u8) -> Self {
        Color {
            r: (value & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: ((value >> 16) & 0xFF) as u8,
            a: alpha,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            self.r, self.g, self.b, self.a
        )
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct ColorVisitor;

impl Visitor<'_> for ColorVisitor {
    type Value = Color;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a color string like #RRGGBBAA")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Color, E> {
        Color::parse(value).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(ColorVisitor)
    }
}
