//! Character writing and cursor motion

use crate::cell::TerminalCell;
use crate::grid::CellGrid;
use unicode_width::UnicodeWidthChar;

const TAB_WIDTH: usize = 8;

impl CellGrid {
    /// Write a character at the cursor with the current pen, then advance.
    ///
    /// Wide characters take two cells (the second is a spacer) and wrap
    /// early rather than split across rows. Zero-width characters attach
    /// to the previously written cell.
    pub fn write_char(&mut self, c: char) {
        let width = c.width().unwrap_or(0);
        if width == 0 {
            self.attach_combining(c);
            return;
        }

        let width = if self.cols < 2 { 1 } else { width.min(2) };
        if width == 2 && self.cursor.col == self.cols - 1 {
            self.wrap_to_next_line();
        }

        let pen = self.pen;
        let (col, row) = (self.cursor.col, self.cursor.row);
        self.set(
            col,
            row,
            TerminalCell {
                c,
                combining: Vec::new(),
                fg: pen.fg,
                bg: pen.bg,
                flags: pen.flags,
                wide_spacer: false,
            },
        );
        if width == 2 {
            self.set(
                col + 1,
                row,
                TerminalCell {
                    c: ' ',
                    fg: pen.fg,
                    bg: pen.bg,
                    flags: pen.flags,
                    wide_spacer: true,
                    ..TerminalCell::default()
                },
            );
        }
        self.advance(width);
    }

    /// Write each character of `text`
    pub fn write_str(&mut self, text: &str) {
        for c in text.chars() {
            self.write_char(c);
        }
    }

    /// Move to column 0
    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
    }

    /// Move down one row, scrolling at the bottom. The column is kept.
    pub fn line_feed(&mut self) {
        if self.cursor.row + 1 < self.rows {
            self.cursor.row += 1;
        } else {
            self.scroll_up(1);
        }
    }

    pub fn backspace(&mut self) {
        self.cursor.col = self.cursor.col.saturating_sub(1);
    }

    /// Advance to the next tab stop (every 8 columns), stopping at the last column
    pub fn tab(&mut self) {
        let next = (self.cursor.col / TAB_WIDTH + 1) * TAB_WIDTH;
        self.cursor.col = next.min(self.cols - 1);
    }

    fn advance(&mut self, n: usize) {
        self.cursor.col += n;
        if self.cursor.col >= self.cols {
            self.wrap_to_next_line();
        }
    }

    fn wrap_to_next_line(&mut self) {
        self.cursor.col = 0;
        self.line_feed();
    }

    fn attach_combining(&mut self, c: char) {
        let (col, row) = if self.cursor.col > 0 {
            (self.cursor.col - 1, self.cursor.row)
        } else if self.cursor.row > 0 {
            (self.cols - 1, self.cursor.row - 1)
        } else {
            return;
        };
        // Step back over the spacer of a wide character
        let col = match self.get(col, row) {
            Some(cell) if cell.wide_spacer && col > 0 => col - 1,
            _ => col,
        };
        if let Some(cell) = self.get_mut(col, row) {
            cell.combining.push(c);
        }
    }
}
