//! ANSI escape-sequence parser
//!
//! Wraps a persistent [`vte::Parser`] so escape sequences and UTF-8 split
//! across reads are reassembled, and turns its callbacks into a flat list of
//! [`TerminalOperation`]s. Printable characters are batched into `Text` runs;
//! any control or escape sequence ends the current run.
//!
//! Only the sequences needed to reconstruct screen text are recognized.
//! Everything else (OSC, DCS, private-mode CSI, unknown finals) is consumed
//! so the parser stays synchronized, and produces nothing.

mod operation;

pub use operation::TerminalOperation;

use vte::{Params, Perform};

/// Stateful byte-stream to operation parser
pub struct AnsiParser {
    parser: vte::Parser,
    collector: OperationCollector,
}

impl AnsiParser {
    pub fn new() -> Self {
        Self {
            parser: vte::Parser::new(),
            collector: OperationCollector::default(),
        }
    }

    /// Feed bytes and return the operations they complete.
    ///
    /// An escape sequence cut off at the end of `bytes` is held until the
    /// next call; a trailing text run is returned immediately.
    pub fn parse(&mut self, bytes: &[u8]) -> Vec<TerminalOperation> {
        self.parser.advance(&mut self.collector, bytes);
        self.collector.flush_text();
        std::mem::take(&mut self.collector.ops)
    }
}

impl Default for AnsiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnsiParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnsiParser")
            .field("pending_ops", &self.collector.ops.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct OperationCollector {
    ops: Vec<TerminalOperation>,
    text: String,
}

impl OperationCollector {
    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.ops
                .push(TerminalOperation::Text(std::mem::take(&mut self.text)));
        }
    }

    fn emit(&mut self, op: TerminalOperation) {
        self.flush_text();
        self.ops.push(op);
    }
}

/// First value of the nth parameter, 0 when absent
fn param(params: &Params, n: usize) -> u16 {
    params
        .iter()
        .nth(n)
        .and_then(|p| p.first())
        .copied()
        .unwrap_or(0)
}

impl Perform for OperationCollector {
    fn print(&mut self, c: char) {
        self.text.push(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\r' => self.emit(TerminalOperation::CarriageReturn),
            // VT and FF behave as LF
            b'\n' | 0x0B | 0x0C => self.emit(TerminalOperation::LineFeed),
            0x08 => self.emit(TerminalOperation::Backspace),
            b'\t' => self.emit(TerminalOperation::Tab),
            _ => self.flush_text(),
        }
    }

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {
        self.flush_text();
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {
        self.flush_text();
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        self.flush_text();
        // Private markers (`?`, `>`) select other sequence families
        if ignore || !intermediates.is_empty() {
            return;
        }
        match action {
            'H' | 'f' => {
                let row = param(params, 0).max(1) as usize - 1;
                let col = param(params, 1).max(1) as usize - 1;
                self.emit(TerminalOperation::CursorPosition { row, col });
            }
            'J' => {
                if matches!(param(params, 0), 2 | 3) {
                    self.emit(TerminalOperation::ClearScreen);
                }
            }
            'K' => self.emit(TerminalOperation::ClearLine),
            'm' => {
                let values = params.iter().flat_map(|p| p.iter().copied()).collect();
                self.emit(TerminalOperation::SetGraphicsRendition(values));
            }
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        self.flush_text();
        if let (b'c', []) = (byte, intermediates) {
            self.emit(TerminalOperation::Reset);
        }
    }
}
