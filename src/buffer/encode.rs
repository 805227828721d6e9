//! Reference encoder for the snapshot format
//!
//! Produces the most compact encoding the decoder accepts: blank rows are
//! collapsed into runs, unstyled spaces use the one-byte shortcut and
//! printable ASCII skips the length prefix. Display widths are not carried
//! on the wire; the decoder recomputes them from the character.

use super::{
    BufferSnapshot, CELL_HAS_BG, CELL_HAS_EXTENDED, CELL_HAS_FG, CELL_IS_UNICODE, CELL_RGB_BG,
    CELL_RGB_FG, CELL_SPACE, FLAG_BELL, MAGIC, MIN_FRAME_LEN, ROW_CONTENT, ROW_EMPTY_RUN, VERSION,
};
use crate::cell::BufferCell;
use crate::color::Color;

/// Encode a snapshot into the binary wire format
pub fn encode(snapshot: &BufferSnapshot) -> Vec<u8> {
    let mut out = Vec::with_capacity(MIN_FRAME_LEN + snapshot.cells.len() * 4);
    out.extend_from_slice(&MAGIC);
    out.push(VERSION);
    out.push(if snapshot.bell { FLAG_BELL } else { 0 });
    out.extend_from_slice(&snapshot.cols.to_le_bytes());
    out.extend_from_slice(&snapshot.rows.to_le_bytes());
    out.extend_from_slice(&snapshot.viewport_y.to_le_bytes());
    out.extend_from_slice(&snapshot.cursor_x.to_le_bytes());
    out.extend_from_slice(&snapshot.cursor_y.to_le_bytes());
    out.extend_from_slice(&[0; 4]);

    let mut rows = snapshot.cells.iter().peekable();
    while let Some(row) = rows.next() {
        if is_blank_row(row) {
            let mut run: u8 = 1;
            while run < u8::MAX && rows.peek().is_some_and(|r| is_blank_row(r)) {
                rows.next();
                run += 1;
            }
            out.push(ROW_EMPTY_RUN);
            out.push(run);
            continue;
        }

        let count = row.len().min(u16::MAX as usize);
        out.push(ROW_CONTENT);
        out.extend_from_slice(&(count as u16).to_le_bytes());
        for cell in &row[..count] {
            encode_cell(cell, &mut out);
        }
    }
    // Every row is already accounted for, so the decoder never reads the padding
    if out.len() < MIN_FRAME_LEN {
        out.resize(MIN_FRAME_LEN, 0);
    }
    out
}

fn is_blank_row(row: &[BufferCell]) -> bool {
    row.len() == 1 && row[0].is_blank()
}

fn encode_cell(cell: &BufferCell, out: &mut Vec<u8>) {
    if cell.is_blank() {
        out.push(CELL_SPACE);
        return;
    }

    let ascii = ascii_byte(&cell.character);
    let mut tag = 0u8;
    if ascii.is_none() {
        tag |= CELL_IS_UNICODE;
    }
    if let Some(fg) = cell.foreground {
        tag |= CELL_HAS_FG;
        if fg.is_rgb() {
            tag |= CELL_RGB_FG;
        }
    }
    if let Some(bg) = cell.background {
        tag |= CELL_HAS_BG;
        if bg.is_rgb() {
            tag |= CELL_RGB_BG;
        }
    }
    if cell.attributes.is_some() {
        tag |= CELL_HAS_EXTENDED;
    }
    // An ASCII cell with no styling would be 0x00 and read back as the space
    // shortcut, so fall back to the length-prefixed form for it.
    if tag == CELL_SPACE {
        tag |= CELL_IS_UNICODE;
    }
    out.push(tag);

    if tag & CELL_IS_UNICODE != 0 {
        let bytes = utf8_prefix(&cell.character, u8::MAX as usize);
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
    } else if let Some(b) = ascii {
        out.push(b);
    }

    for color in [cell.foreground, cell.background].into_iter().flatten() {
        match color {
            Color::Palette(idx) => out.push(idx),
            Color::Rgb(r, g, b) => out.extend_from_slice(&[r, g, b]),
        }
    }
    if let Some(attrs) = cell.attributes {
        out.push(attrs);
    }
}

fn ascii_byte(s: &str) -> Option<u8> {
    match s.as_bytes() {
        [b @ 32..=126] => Some(*b),
        _ => None,
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char
fn utf8_prefix(s: &str, max: usize) -> &[u8] {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s.as_bytes()[..end]
}
