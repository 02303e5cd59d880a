//! Chart palette: three configurable colours and the ramp built from them.

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid colour {0:?}, expected #RRGGBB")]
pub struct ColorError(pub String);

/// Colours passed to every chart. Hex strings so they round-trip through
/// the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    #[serde(default = "default_primary")]
    pub primary: String,
    #[serde(default = "default_secondary")]
    pub secondary: String,
    #[serde(default = "default_accent")]
    pub accent: String,
}

fn default_primary() -> String {
    "#000000".to_string() // Black
}

fn default_secondary() -> String {
    "#979797".to_string() // Gray
}

fn default_accent() -> String {
    "#FFBA08".to_string() // Gold
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            accent: default_accent(),
        }
    }
}

/// Parsed palette ready for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colors {
    pub primary: RGBColor,
    pub secondary: RGBColor,
    pub accent: RGBColor,
}

impl Colors {
    /// Series colour by index, cycling primary, accent, secondary.
    pub fn series(&self, index: usize) -> RGBColor {
        match index % 3 {
            0 => self.primary,
            1 => self.accent,
            _ => self.secondary,
        }
    }

    /// Linear ramp primary -> secondary -> accent; `t` is clamped to 0..=1.
    pub fn ramp(&self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        if t <= 0.5 {
            lerp(self.primary, self.secondary, t * 2.0)
        } else {
            lerp(self.secondary, self.accent, (t - 0.5) * 2.0)
        }
    }
}

impl Palette {
    pub fn colors(&self) -> Result<Colors, ColorError> {
        Ok(Colors {
            primary: parse_hex(&self.primary)?,
            secondary: parse_hex(&self.secondary)?,
            accent: parse_hex(&self.accent)?,
        })
    }
}

pub fn parse_hex(value: &str) -> Result<RGBColor, ColorError> {
    let err = || ColorError(value.to_string());
    let hex = value.strip_prefix('#').ok_or_else(err)?;
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(err());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

fn lerp(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
