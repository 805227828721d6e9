//! Virtual terminal emulator
//!
//! Feeds raw PTY output through the [`AnsiParser`] and applies the resulting
//! operations to a [`CellGrid`]. This is deliberately not a full VT
//! implementation: it tracks just enough state (cursor, wrap, scroll, clear,
//! basic SGR) to reproduce the visible text of a remote screen.

use crate::ansi::{AnsiParser, TerminalOperation};
use crate::cell::CellFlags;
use crate::color::Color;
use crate::grid::{CellGrid, Pen, DEFAULT_COLS, DEFAULT_ROWS};

/// Parser plus grid for one monitored session
#[derive(Debug)]
pub struct VirtualTerminal {
    parser: AnsiParser,
    grid: CellGrid,
}

impl VirtualTerminal {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            parser: AnsiParser::new(),
            grid: CellGrid::new(cols, rows),
        }
    }

    /// Process raw output bytes
    pub fn process(&mut self, data: &[u8]) {
        for op in self.parser.parse(data) {
            self.apply(op);
        }
    }

    /// Apply a single parsed operation to the grid
    pub fn apply(&mut self, op: TerminalOperation) {
        match op {
            TerminalOperation::Text(text) => self.grid.write_str(&text),
            TerminalOperation::CarriageReturn => self.grid.carriage_return(),
            TerminalOperation::LineFeed => self.grid.line_feed(),
            TerminalOperation::Backspace => self.grid.backspace(),
            TerminalOperation::Tab => self.grid.tab(),
            TerminalOperation::CursorPosition { row, col } => self.grid.set_cursor(row, col),
            TerminalOperation::ClearScreen => self.grid.clear(),
            TerminalOperation::ClearLine => self.grid.clear_line(),
            TerminalOperation::SetGraphicsRendition(params) => {
                apply_sgr(self.grid.pen_mut(), &params)
            }
            TerminalOperation::Reset => self.grid.reset(),
        }
    }

    /// Resize, keeping the overlapping region
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.grid.resize(cols, rows);
    }

    /// Visible screen as plain text
    pub fn text(&self) -> String {
        self.grid.text()
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// (cols, rows)
    pub fn size(&self) -> (usize, usize) {
        (self.grid.cols(), self.grid.rows())
    }
}

impl Default for VirtualTerminal {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}

/// Apply SGR parameters to the pen.
///
/// Attributes are additive and only cleared by a reset. Extended color
/// forms (`38;5;n`, `38;2;r;g;b` and the `48` equivalents) are consumed as a
/// unit so their arguments are never mistaken for other codes.
fn apply_sgr(pen: &mut Pen, params: &[u16]) {
    if params.is_empty() {
        pen.reset();
        return;
    }

    let mut i = 0;
    while i < params.len() {
        match params[i] {
            0 => pen.reset(),
            1 => pen.flags |= CellFlags::BOLD,
            2 => pen.flags |= CellFlags::DIM,
            3 => pen.flags |= CellFlags::ITALIC,
            4 => pen.flags |= CellFlags::UNDERLINE,
            p @ 30..=37 => pen.fg = Some(Color::ansi((p - 30) as u8)),
            39 => pen.fg = None,
            p @ 40..=47 => pen.bg = Some(Color::ansi((p - 40) as u8)),
            49 => pen.bg = None,
            p @ 90..=97 => pen.fg = Some(Color::Palette((p - 90) as u8 + 8)),
            p @ 100..=107 => pen.bg = Some(Color::Palette((p - 100) as u8 + 8)),
            p @ (38 | 48) => {
                let (color, used) = extended_color(&params[i + 1..]);
                if let Some(color) = color {
                    if p == 38 {
                        pen.fg = Some(color);
                    } else {
                        pen.bg = Some(color);
                    }
                }
                i += used;
            }
            _ => {}
        }
        i += 1;
    }
}

/// Parse the arguments after 38/48. Returns the color and how many
/// parameters were consumed.
fn extended_color(args: &[u16]) -> (Option<Color>, usize) {
    match args {
        [5, idx, ..] => (Some(Color::Palette(*idx as u8)), 2),
        [2, r, g, b, ..] => (Some(Color::Rgb(*r as u8, *g as u8, *b as u8)), 4),
        [5] | [2, ..] => (None, args.len()),
        _ => (None, 0),
    }
}
