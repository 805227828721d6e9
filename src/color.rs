//! Cell colors
//!
//! Colors arrive either as a 256-entry palette index or as a 24-bit RGB
//! triple. "No color" (terminal default) is expressed as `Option<Color>`
//! at the use site rather than with a sentinel value.

use serde::{Deserialize, Serialize};

/// Alpha byte set on packed RGB values so they can never collide with a
/// palette index.
pub const PACKED_RGB_ALPHA: u32 = 0xFF00_0000;

/// A foreground or background color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Index into the 256-color palette (0-7 are the basic ANSI colors)
    Palette(u8),
    /// 24-bit true color
    Rgb(u8, u8, u8),
}

impl Color {
    /// Pack the color into a single `u32`.
    ///
    /// Palette colors pack to their index; RGB colors pack as
    /// `0xFF000000 | R << 16 | G << 8 | B`.
    pub fn packed(self) -> u32 {
        match self {
            Color::Palette(idx) => idx as u32,
            Color::Rgb(r, g, b) => {
                PACKED_RGB_ALPHA | (r as u32) << 16 | (g as u32) << 8 | b as u32
            }
        }
    }

    /// Inverse of [`Color::packed`]. Values above 255 without the alpha byte
    /// are not valid packings.
    pub fn from_packed(value: u32) -> Option<Self> {
        if value & PACKED_RGB_ALPHA == PACKED_RGB_ALPHA {
            Some(Color::Rgb(
                (value >> 16) as u8,
                (value >> 8) as u8,
                value as u8,
            ))
        } else if value <= 0xFF {
            Some(Color::Palette(value as u8))
        } else {
            None
        }
    }

    /// Basic 3-bit ANSI color (SGR 30-37 / 40-47)
    pub fn ansi(code: u8) -> Self {
        Color::Palette(code & 0x07)
    }

    /// Whether this is true color
    pub fn is_rgb(self) -> bool {
        matches!(self, Color::Rgb(..))
    }
}
