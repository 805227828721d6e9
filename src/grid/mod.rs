//! Emulator cell grid
//!
//! A fixed-size 2D grid of [`TerminalCell`]s plus the cursor and the "pen"
//! (colors and attributes applied to subsequently written characters).
//! There is no scrollback: rows scrolled off the top are discarded.

use crate::cell::{CellFlags, TerminalCell};
use crate::color::Color;

mod edit;
mod erase;
mod export;
mod scroll;

/// Default emulator width
pub const DEFAULT_COLS: usize = 80;
/// Default emulator height
pub const DEFAULT_ROWS: usize = 24;

/// Cursor position, always inside the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

/// Style applied to newly written characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pen {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub flags: CellFlags,
}

impl Pen {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A 2D grid of terminal cells with a cursor
#[derive(Debug, Clone)]
pub struct CellGrid {
    /// Number of columns
    pub(crate) cols: usize,
    /// Number of rows
    pub(crate) rows: usize,
    /// Cell data (row-major order)
    pub(crate) cells: Vec<TerminalCell>,
    pub(crate) cursor: Cursor,
    pub(crate) pen: Pen,
}

impl CellGrid {
    /// Create a blank grid. Zero dimensions are raised to 1.
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cells: vec![TerminalCell::default(); cols * rows],
            cursor: Cursor::default(),
            pen: Pen::default(),
        }
    }

    /// Get the number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get the number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Move the cursor, clamping into the grid
    pub fn set_cursor(&mut self, row: usize, col: usize) {
        self.cursor.row = row.min(self.rows - 1);
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    pub fn pen_mut(&mut self) -> &mut Pen {
        &mut self.pen
    }

    /// Get a reference to a cell at (col, row)
    pub fn get(&self, col: usize, row: usize) -> Option<&TerminalCell> {
        if col < self.cols && row < self.rows {
            Some(&self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    /// Get a mutable reference to a cell at (col, row)
    pub fn get_mut(&mut self, col: usize, row: usize) -> Option<&mut TerminalCell> {
        if col < self.cols && row < self.rows {
            Some(&mut self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    /// Set a cell at (col, row)
    pub fn set(&mut self, col: usize, row: usize, cell: TerminalCell) {
        if let Some(c) = self.get_mut(col, row) {
            *c = cell;
        }
    }

    /// Get a row as a slice
    pub fn row(&self, row: usize) -> Option<&[TerminalCell]> {
        if row < self.rows {
            let start = row * self.cols;
            Some(&self.cells[start..start + self.cols])
        } else {
            None
        }
    }

    /// Get a mutable row
    pub fn row_mut(&mut self, row: usize) -> Option<&mut [TerminalCell]> {
        if row < self.rows {
            let start = row * self.cols;
            let end = start + self.cols;
            Some(&mut self.cells[start..end])
        } else {
            None
        }
    }
}

impl Default for CellGrid {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}

#[cfg(test)]
mod tests;
