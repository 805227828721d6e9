//! Operations produced by the ANSI parser

/// A single state change requested by the output stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOperation {
    /// A run of printable characters
    Text(String),
    CarriageReturn,
    LineFeed,
    Backspace,
    Tab,
    /// Absolute cursor move, 0-indexed
    CursorPosition { row: usize, col: usize },
    /// `CSI 2 J` / `CSI 3 J`
    ClearScreen,
    /// `CSI K`
    ClearLine,
    /// `CSI ... m`, parameters flattened in order
    SetGraphicsRendition(Vec<u16>),
    /// `ESC c`
    Reset,
}
