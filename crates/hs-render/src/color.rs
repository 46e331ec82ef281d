use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

pub const BLACK: Color = Color::rgb(0, 0, 0);
pub const WHITE: Color = Color::rgb(255, 255, 255);
/// Used when an artifact carries a color string we cannot parse.
pub const FALLBACK: Color = Color::rgb(0x9c, 0x9c, 0xa1);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(mut self, a: f64) -> Self {
        self.a = a;
        self
    }

    /// Parse `#rrggbb`, `#rgb` or one of a few basic color names.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            let digits: Vec<u8> = hex
                .chars()
                .map(|c| c.to_digit(16).map(|d| d as u8))
                .collect::<Option<Vec<_>>>()?;
            return match digits.as_slice() {
                [r, g, b] => Some(Self::rgb(r * 17, g * 17, b * 17)),
                [r1, r0, g1, g0, b1, b0] => {
                    Some(Self::rgb(r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0))
                }
                _ => None,
            };
        }
        match s.to_ascii_lowercase().as_str() {
            "black" => Some(BLACK),
            "white" => Some(WHITE),
            "red" => Some(Self::rgb(255, 0, 0)),
            "green" => Some(Self::rgb(0, 128, 0)),
            "blue" => Some(Self::rgb(0, 0, 255)),
            "gray" | "grey" => Some(Self::rgb(128, 128, 128)),
            _ => None,
        }
    }

    /// Like [`Color::parse`], falling back to a neutral gray.
    pub fn parse_or_fallback(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!(color = s, "unparseable color, using gray");
            FALLBACK
        })
    }

    pub fn to_svg_fill(&self) -> String {
        if (self.a - 1.0).abs() < 1e-6 {
            self.to_hex()
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_svg_fill())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color: {s}")))
    }
}

/// Serialized as `#rrggbb`; alpha is not part of the config format.
impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl Default for Color {
    fn default() -> Self {
        BLACK
    }
}
