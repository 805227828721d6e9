//! Terminal screen narration in Rust
//!
//! Reconstructs the visible state of a remote pseudo-terminal and turns
//! successive screens into small narration chunks that never repeat content
//! already delivered.
//!
//! ## Screen Sources
//! - Binary snapshot frames (compact run-length row format, see [`buffer`])
//! - Raw PTY output replayed through a minimal emulator ([`emulator`])
//!
//! ## Change Detection
//! - Scroll detection by matching the previous screen's tail in the new one
//! - Clear / full-rewrite detection with a discontinuity marker
//! - Size and idle-time flush thresholds with exactly-once delivery
//!
//! ## Transport (feature `streaming`)
//! - WebSocket client with token auth, keepalive and exponential reconnect
//! - Automatic re-subscription after a dropped connection
//! - Per-session pipelines wiring frames into accumulators ([`session`])

pub mod accumulator;
pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod config;
pub mod emulator;
pub mod grid;
#[cfg(feature = "streaming")]
pub mod session;
#[cfg(feature = "streaming")]
pub mod streaming;

pub use accumulator::{AccumulatorConfig, ChangeAccumulator, NarrationChunk, NarrationSink};
pub use buffer::{decode, BufferSnapshot, DecodeError};
pub use cell::{BufferCell, CellFlags, TerminalCell};
pub use color::Color;
pub use config::{ConfigError, NarratorConfig};
pub use emulator::VirtualTerminal;
pub use grid::CellGrid;
#[cfg(feature = "streaming")]
pub use session::NarrationSession;
#[cfg(feature = "streaming")]
pub use streaming::{ConnectionState, TransportClient, TransportConfig};
