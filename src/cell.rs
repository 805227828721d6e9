//! Cell types shared by the snapshot decoder and the emulator grid

use crate::color::Color;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Text attribute bitset as carried on the wire and held by the emulator pen
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const REVERSE = 1 << 5;
        const HIDDEN = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

/// A decoded snapshot cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferCell {
    /// Grapheme in this cell; empty means blank
    pub character: String,
    /// Columns occupied: 0 (combining), 1, or 2 (wide)
    pub display_width: u8,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    /// Raw attribute byte, see [`CellFlags`]
    pub attributes: Option<u8>,
}

impl BufferCell {
    /// Create a cell, computing its display width from the character
    pub fn new(character: impl Into<String>) -> Self {
        let character = character.into();
        let display_width = crate::buffer::width::str_display_width(&character);
        Self {
            character,
            display_width,
            foreground: None,
            background: None,
            attributes: None,
        }
    }

    /// The blank cell: a single unstyled space
    pub fn blank() -> Self {
        Self {
            character: " ".to_string(),
            display_width: 1,
            foreground: None,
            background: None,
            attributes: None,
        }
    }

    pub fn with_foreground(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_attributes(mut self, attributes: u8) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Whether this is exactly the blank cell
    pub fn is_blank(&self) -> bool {
        *self == Self::blank()
    }

    /// Attribute byte as typed flags
    pub fn flags(&self) -> CellFlags {
        CellFlags::from_bits_retain(self.attributes.unwrap_or(0))
    }
}

impl Default for BufferCell {
    fn default() -> Self {
        Self::blank()
    }
}

/// A mutable cell in the emulator grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCell {
    pub c: char,
    /// Zero-width code points attached to `c`
    pub combining: Vec<char>,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub flags: CellFlags,
    /// Placeholder occupying the right half of a wide character
    pub wide_spacer: bool,
}

impl TerminalCell {
    pub fn new(c: char) -> Self {
        Self {
            c,
            ..Self::default()
        }
    }

    /// Reset to a blank cell
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Character plus any combining marks
    pub fn grapheme(&self) -> String {
        let mut s = String::with_capacity(1 + self.combining.len());
        s.push(self.c);
        s.extend(self.combining.iter());
        s
    }
}

impl Default for TerminalCell {
    fn default() -> Self {
        Self {
            c: ' ',
            combining: Vec::new(),
            fg: None,
            bg: None,
            flags: CellFlags::empty(),
            wide_spacer: false,
        }
    }
}
