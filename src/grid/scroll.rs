//! Scrolling and resizing for the cell grid

use crate::cell::TerminalCell;
use crate::grid::CellGrid;

impl CellGrid {
    /// Scroll up by n lines. Top rows are discarded and blank rows appended.
    pub fn scroll_up(&mut self, n: usize) {
        let n = n.min(self.rows);
        if n == 0 {
            return;
        }
        self.cells.drain(..n * self.cols);
        self.cells
            .extend(std::iter::repeat_n(TerminalCell::default(), n * self.cols));
    }

    /// Resize in place, keeping the overlapping top-left rectangle and
    /// clamping the cursor. Zero dimensions are raised to 1.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if self.cols == cols && self.rows == rows {
            return;
        }

        let mut cells = vec![TerminalCell::default(); cols * rows];
        let keep_cols = cols.min(self.cols);
        for row in 0..rows.min(self.rows) {
            let src = row * self.cols;
            let dst = row * cols;
            cells[dst..dst + keep_cols].clone_from_slice(&self.cells[src..src + keep_cols]);
            // Drop a wide character whose spacer fell outside the new width
            if keep_cols < self.cols && self.cells[src + keep_cols].wide_spacer {
                cells[dst + keep_cols - 1].reset();
            }
        }

        self.cols = cols;
        self.rows = rows;
        self.cells = cells;
        self.set_cursor(self.cursor.row, self.cursor.col);
    }
}
