//! Binary terminal-buffer snapshot format
//!
//! A snapshot is a 28-byte little-endian header followed by a row stream.
//! Frames shorter than [`MIN_FRAME_LEN`] are rejected outright.
//!
//! ```text
//! 0      2    3     4      8      12         16       20       24        28
//! | "VT" | v1 | flg | cols | rows | viewportY| cursorX| cursorY| reserved |
//! ```
//!
//! Each row starts with a marker byte: [`ROW_EMPTY_RUN`] followed by a count
//! of blank rows, or [`ROW_CONTENT`] followed by a `u16` cell count and that
//! many encoded cells. Any other marker ends the row stream.
//!
//! Header problems reject the frame. Truncation inside the row stream does
//! not: decoding stops and the missing rows are filled with blanks, so a
//! partially delivered frame still yields a usable screen.

mod encode;
mod error;
pub mod frame;
mod reader;
pub mod width;

pub use encode::encode;
pub use error::{DecodeError, Result};
pub use frame::{decode_frame, encode_frame, Frame, FRAME_MAGIC};

use crate::cell::BufferCell;
use crate::color::Color;
use reader::ByteReader;

/// Snapshot magic, "VT" in wire order
pub const MAGIC: [u8; 2] = *b"VT";
/// The only supported format version
pub const VERSION: u8 = 0x01;
/// Length of the header fields; the row stream starts here
pub const HEADER_LEN: usize = 28;
/// Shortest frame the decoder accepts
pub const MIN_FRAME_LEN: usize = 32;
/// Largest accepted column or row count
pub const MAX_DIMENSION: u32 = 1000;

/// Header flag: a bell rang since the previous snapshot
pub const FLAG_BELL: u8 = 0x01;

/// Row marker: run of blank rows, next byte is the count
pub const ROW_EMPTY_RUN: u8 = 0xFE;
/// Row marker: content row, next two bytes are the cell count
pub const ROW_CONTENT: u8 = 0xFD;

/// Cell tag shortcut for an unstyled space
pub const CELL_SPACE: u8 = 0x00;
pub const CELL_HAS_EXTENDED: u8 = 0x80;
pub const CELL_IS_UNICODE: u8 = 0x40;
pub const CELL_HAS_FG: u8 = 0x20;
pub const CELL_HAS_BG: u8 = 0x10;
pub const CELL_RGB_FG: u8 = 0x08;
pub const CELL_RGB_BG: u8 = 0x04;

/// A decoded, immutable view of a remote terminal screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub cols: u32,
    pub rows: u32,
    pub viewport_y: i32,
    pub cursor_x: i32,
    pub cursor_y: i32,
    /// Bell rang since the previous snapshot
    pub bell: bool,
    /// Exactly `rows` rows, each holding at most `cols` cells
    pub cells: Vec<Vec<BufferCell>>,
}

impl BufferSnapshot {
    /// A screen of blank rows
    pub fn blank(cols: u32, rows: u32) -> Self {
        Self {
            cols,
            rows,
            viewport_y: 0,
            cursor_x: 0,
            cursor_y: 0,
            bell: false,
            cells: vec![vec![BufferCell::blank()]; rows as usize],
        }
    }

    /// Text of one row with trailing whitespace removed
    pub fn row_text(&self, row: usize) -> String {
        let Some(cells) = self.cells.get(row) else {
            return String::new();
        };
        let mut line = String::new();
        let mut after_wide = false;
        for cell in cells {
            if cell.character.is_empty() {
                // The right half of a wide character is sent as an empty cell
                if !after_wide {
                    line.push(' ');
                }
                after_wide = false;
                continue;
            }
            line.push_str(&cell.character);
            after_wide = cell.display_width == 2;
        }
        line.truncate(line.trim_end().len());
        line
    }

    /// Visible text, one line per row, with trailing blank rows dropped
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = (0..self.cells.len()).map(|r| self.row_text(r)).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}

/// Decode one snapshot.
///
/// Pure: the input is never modified and nothing is retained. Header errors
/// are returned before any cell is decoded.
pub fn decode(bytes: &[u8]) -> Result<BufferSnapshot> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort {
            needed: MIN_FRAME_LEN,
            actual: bytes.len(),
        });
    }

    let too_short = || DecodeError::TooShort {
        needed: MIN_FRAME_LEN,
        actual: bytes.len(),
    };
    let mut r = ByteReader::new(bytes);

    let magic: [u8; 2] = r.array().ok_or_else(too_short)?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic(magic));
    }
    let version = r.u8().ok_or_else(too_short)?;
    if version != VERSION {
        return Err(DecodeError::BadVersion(version));
    }
    let flags = r.u8().ok_or_else(too_short)?;
    let cols = r.u32_le().ok_or_else(too_short)?;
    let rows = r.u32_le().ok_or_else(too_short)?;
    let viewport_y = r.i32_le().ok_or_else(too_short)?;
    let cursor_x = r.i32_le().ok_or_else(too_short)?;
    let cursor_y = r.i32_le().ok_or_else(too_short)?;
    r.bytes(4).ok_or_else(too_short)?;

    if !(1..=MAX_DIMENSION).contains(&cols) || !(1..=MAX_DIMENSION).contains(&rows) {
        return Err(DecodeError::InvalidDimensions { cols, rows });
    }

    let mut cells = Vec::with_capacity(rows as usize);
    decode_rows(&mut r, rows as usize, cols as usize, &mut cells);
    while cells.len() < rows as usize {
        cells.push(vec![BufferCell::blank()]);
    }

    Ok(BufferSnapshot {
        cols,
        rows,
        viewport_y,
        cursor_x,
        cursor_y,
        bell: flags & FLAG_BELL != 0,
        cells,
    })
}

/// Decode rows until `rows` are produced, input runs out, or an unknown
/// marker is seen.
fn decode_rows(r: &mut ByteReader<'_>, rows: usize, cols: usize, out: &mut Vec<Vec<BufferCell>>) {
    while out.len() < rows {
        let Some(marker) = r.u8() else {
            return;
        };
        match marker {
            ROW_EMPTY_RUN => {
                let Some(count) = r.u8() else {
                    return;
                };
                let count = (count as usize).min(rows - out.len());
                out.extend(std::iter::repeat_n(vec![BufferCell::blank()], count));
            }
            ROW_CONTENT => {
                let Some(count) = r.u16_le() else {
                    return;
                };
                let mut row = Vec::with_capacity((count as usize).min(cols));
                for _ in 0..count {
                    match decode_cell(r) {
                        Some(cell) => row.push(cell),
                        None => {
                            if !row.is_empty() {
                                row.truncate(cols);
                                out.push(row);
                            }
                            return;
                        }
                    }
                }
                row.truncate(cols);
                out.push(row);
            }
            _ => return,
        }
    }
}

fn decode_cell(r: &mut ByteReader<'_>) -> Option<BufferCell> {
    let tag = r.u8()?;
    if tag == CELL_SPACE {
        return Some(BufferCell::blank());
    }

    let mut cell = if tag & CELL_IS_UNICODE != 0 {
        let len = r.u8()? as usize;
        let raw = r.bytes(len)?;
        BufferCell::new(String::from_utf8_lossy(raw).into_owned())
    } else {
        let ch = match r.u8()? {
            0 => ' ',
            b @ 32..=126 => b as char,
            _ => '?',
        };
        BufferCell::new(ch.to_string())
    };

    if tag & CELL_HAS_FG != 0 {
        cell.foreground = Some(decode_color(r, tag & CELL_RGB_FG != 0)?);
    }
    if tag & CELL_HAS_BG != 0 {
        cell.background = Some(decode_color(r, tag & CELL_RGB_BG != 0)?);
    }
    if tag & CELL_HAS_EXTENDED != 0 {
        cell.attributes = Some(r.u8()?);
    }
    Some(cell)
}

fn decode_color(r: &mut ByteReader<'_>, rgb: bool) -> Option<Color> {
    if rgb {
        let [red, green, blue] = r.array::<3>()?;
        Some(Color::Rgb(red, green, blue))
    } else {
        r.u8().map(Color::Palette)
    }
}
