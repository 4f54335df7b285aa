//! RGB color type shared by materials, lights and the property panel.
//!
//! Colors arrive from the panel as hex strings (`"#ccffcc"`), from page code as
//! packed `0xRRGGBB` integers, and are stored as linear 0-1 floats.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An RGB color with components in the 0-1 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a packed `0xRRGGBB` value. Bits above 24 are ignored.
    pub fn from_u32(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `0xrrggbb`.
    /// Returns None for anything else.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix('#')
            .or_else(|| s.strip_prefix("0x"))
            .unwrap_or(s);

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        match digits.len() {
            6 => u32::from_str_radix(digits, 16).ok().map(Self::from_u32),
            3 => {
                // #rgb expands each nibble: f -> ff
                let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&expanded, 16).ok().map(Self::from_u32)
            }
            _ => None,
        }
    }

    /// Packed `0xRRGGBB` value, components clamped to 0-1.
    pub fn to_u32(&self) -> u32 {
        let channel = |v: f32| (v.max(0.0).min(1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// Lowercase `#rrggbb` string.
    pub fn to_hex(&self) -> String {
        format!("#{:06x}", self.to_u32())
    }

    /// Hue, saturation and lightness, each in 0-1.
    pub fn to_hsl(&self) -> (f32, f32, f32) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let lightness = (min + max) / 2.0;

        if (max - min).abs() < f32::EPSILON {
            return (0.0, 0.0, lightness);
        }

        let delta = max - min;
        let saturation = if lightness <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        let hue = if max == self.r {
            (self.g - self.b) / delta + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        };

        (hue / 6.0, saturation, lightness)
    }

    /// Build a color from hue, saturation and lightness.
    /// Hue wraps, saturation and lightness are clamped to 0-1.
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.max(0.0).min(1.0);
        let l = l.max(0.0).min(1.0);

        if s == 0.0 {
            return Self::new(l, l, l);
        }

        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;

        Self::new(
            hue_to_rgb(q, p, h + 1.0 / 3.0),
            hue_to_rgb(q, p, h),
            hue_to_rgb(q, p, h - 1.0 / 3.0),
        )
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * 6.0 * (2.0 / 3.0 - t);
    }
    p
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_variants() {
        assert_eq!(Color::from_hex("#ff0000"), Some(Color::new(1.0, 0.0, 0.0)));
        assert_eq!(Color::from_hex("00ff00"), Some(Color::new(0.0, 1.0, 0.0)));
        assert_eq!(Color::from_hex("0x0000ff"), Some(Color::new(0.0, 0.0, 1.0)));
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#gggggg"), None);
    }

    #[test]
    fn test_hex_round_trip_is_lowercase() {
        let c = Color::from_u32(0xCCFFCC);
        assert_eq!(c.to_hex(), "#ccffcc");
        assert_eq!(c.to_u32(), 0xccffcc);
    }

    #[test]
    fn test_hsl_of_primary() {
        let (h, s, l) = Color::new(1.0, 0.0, 0.0).to_hsl();
        assert!(h.abs() < 1e-6);
        assert!((s - 1.0).abs() < 1e-6);
        assert!((l - 0.5).abs() < 1e-6);

        let back = Color::from_hsl(h, s, l);
        assert!((back.r - 1.0).abs() < 1e-5);
        assert!(back.g.abs() < 1e-5);
    }

    #[test]
    fn test_grey_has_no_saturation() {
        let (_, s, l) = Color::new(0.4, 0.4, 0.4).to_hsl();
        assert_eq!(s, 0.0);
        assert!((l - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::from_u32(0x7777ff)).unwrap();
        assert_eq!(json, "\"#7777ff\"");
        let parsed: Color = serde_json::from_str("\"#7777ff\"").unwrap();
        assert_eq!(parsed.to_u32(), 0x7777ff);
    }
}
