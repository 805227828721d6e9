//! Erase and clear operations for the cell grid

use crate::cell::TerminalCell;
use crate::grid::CellGrid;

impl CellGrid {
    /// Clear the entire grid. The cursor and pen are kept.
    pub fn clear(&mut self) {
        self.cells.fill(TerminalCell::default());
    }

    /// Clear a specific row
    pub fn clear_row(&mut self, row: usize) {
        if let Some(row_cells) = self.row_mut(row) {
            row_cells.fill(TerminalCell::default());
        }
    }

    /// Clear the row the cursor is on
    pub fn clear_line(&mut self) {
        self.clear_row(self.cursor.row);
    }

    /// Blank grid, home cursor, default pen
    pub fn reset(&mut self) {
        self.clear();
        self.cursor = Default::default();
        self.pen.reset();
    }
}
