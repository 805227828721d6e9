//! Plain-text export for the cell grid

use crate::grid::CellGrid;

impl CellGrid {
    /// Get the text content of a row, trailing whitespace removed
    pub fn row_text(&self, row: usize) -> String {
        let Some(cells) = self.row(row) else {
            return String::new();
        };
        let mut line = String::with_capacity(self.cols);
        for cell in cells.iter().filter(|cell| !cell.wide_spacer) {
            line.push(cell.c);
            line.extend(cell.combining.iter());
        }
        line.truncate(line.trim_end().len());
        line
    }

    /// Visible screen as plain text: one line per row, trailing blank rows
    /// dropped, no trailing newline
    pub fn text(&self) -> String {
        let mut lines: Vec<String> = (0..self.rows).map(|r| self.row_text(r)).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}
