use super::*;
use crate::cell::TerminalCell;

#[test]
fn test_grid_creation() {
    let grid = CellGrid::default();
    assert_eq!(grid.cols(), 80);
    assert_eq!(grid.rows(), 24);
    assert_eq!(grid.cursor(), Cursor { row: 0, col: 0 });
}

#[test]
fn test_grid_set_get() {
    let mut grid = CellGrid::new(80, 24);
    grid.set(5, 10, TerminalCell::new('A'));

    let retrieved = grid.get(5, 10).unwrap();
    assert_eq!(retrieved.c, 'A');
    assert!(grid.get(80, 0).is_none());
}

#[test]
fn test_grid_clear() {
    let mut grid = CellGrid::new(80, 24);
    grid.set(5, 10, TerminalCell::new('A'));
    grid.clear();

    let cell = grid.get(5, 10).unwrap();
    assert_eq!(cell.c, ' ');
}

#[test]
fn test_write_advances_and_wraps() {
    let mut grid = CellGrid::new(3, 2);
    grid.write_str("abcd");
    assert_eq!(grid.row_text(0), "abc");
    assert_eq!(grid.row_text(1), "d");
    assert_eq!(grid.cursor(), Cursor { row: 1, col: 1 });
}

#[test]
fn test_write_at_bottom_right_scrolls() {
    let mut grid = CellGrid::new(2, 2);
    grid.write_str("abcd");
    // "cd" filled the last row, the cursor wrapped and the grid scrolled
    assert_eq!(grid.text(), "cd");
    assert_eq!(grid.cursor(), Cursor { row: 1, col: 0 });
}

#[test]
fn test_line_feed_keeps_column() {
    let mut grid = CellGrid::new(10, 3);
    grid.write_str("ab");
    grid.line_feed();
    grid.write_str("c");
    assert_eq!(grid.row_text(1), "  c");
}

#[test]
fn test_grid_scroll() {
    let mut grid = CellGrid::new(80, 24);
    grid.set(0, 0, TerminalCell::new('A'));
    grid.set(0, 1, TerminalCell::new('B'));

    grid.scroll_up(1);

    assert_eq!(grid.get(0, 0).unwrap().c, 'B');
    assert_eq!(grid.get(0, 23).unwrap().c, ' ');
}

#[test]
fn test_grid_resize_preserves_overlap() {
    let mut grid = CellGrid::new(80, 24);
    grid.set(5, 5, TerminalCell::new('X'));
    grid.set(70, 20, TerminalCell::new('Y'));
    grid.set_cursor(20, 70);

    grid.resize(40, 10);
    assert_eq!(grid.cols(), 40);
    assert_eq!(grid.rows(), 10);
    assert_eq!(grid.get(5, 5).unwrap().c, 'X');
    assert_eq!(grid.cursor(), Cursor { row: 9, col: 39 });

    grid.resize(100, 30);
    assert_eq!(grid.get(5, 5).unwrap().c, 'X');
    assert_eq!(grid.get(99, 29).unwrap().c, ' ');
}

#[test]
fn test_resize_drops_split_wide_char() {
    let mut grid = CellGrid::new(5, 1);
    grid.set_cursor(0, 2);
    grid.write_char('中');
    assert_eq!(grid.row_text(0), "  中");
    grid.resize(3, 1);
    assert_eq!(grid.row_text(0), "");
}

#[test]
fn test_set_cursor_clamps() {
    let mut grid = CellGrid::new(10, 5);
    grid.set_cursor(100, 100);
    assert_eq!(grid.cursor(), Cursor { row: 4, col: 9 });
}

#[test]
fn test_wide_char_uses_spacer() {
    let mut grid = CellGrid::new(10, 2);
    grid.write_str("中a");
    assert!(grid.get(1, 0).unwrap().wide_spacer);
    assert_eq!(grid.get(2, 0).unwrap().c, 'a');
    assert_eq!(grid.row_text(0), "中a");
}

#[test]
fn test_wide_char_wraps_at_last_column() {
    let mut grid = CellGrid::new(3, 2);
    grid.write_str("ab中");
    assert_eq!(grid.row_text(0), "ab");
    assert_eq!(grid.row_text(1), "中");
}

#[test]
fn test_combining_attaches_to_previous_cell() {
    let mut grid = CellGrid::new(10, 1);
    grid.write_str("e\u{0301}x");
    assert_eq!(grid.row_text(0), "e\u{0301}x");
    assert_eq!(grid.cursor().col, 2);
}

#[test]
fn test_tab_stops() {
    let mut grid = CellGrid::new(20, 1);
    grid.write_char('a');
    grid.tab();
    assert_eq!(grid.cursor().col, 8);
    grid.tab();
    grid.tab();
    assert_eq!(grid.cursor().col, 19);
}

#[test]
fn test_pen_applies_to_written_cells() {
    let mut grid = CellGrid::new(10, 1);
    grid.pen_mut().fg = Some(crate::color::Color::Palette(1));
    grid.write_char('r');
    assert_eq!(grid.get(0, 0).unwrap().fg, Some(crate::color::Color::Palette(1)));
}

#[test]
fn test_text_drops_trailing_blank_rows() {
    let mut grid = CellGrid::new(10, 5);
    grid.write_str("hi  ");
    assert_eq!(grid.text(), "hi");
    grid.reset();
    assert_eq!(grid.text(), "");
}
