//! Error types for snapshot and frame decoding

use std::fmt;

/// Errors that reject a snapshot frame outright.
///
/// Truncation inside the row stream is not an error; see
/// [`decode`](crate::buffer::decode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the fixed header (or envelope header) requires
    TooShort {
        /// Bytes required
        needed: usize,
        /// Bytes available
        actual: usize,
    },

    /// Snapshot magic was not "VT"
    BadMagic([u8; 2]),

    /// Unsupported format version
    BadVersion(u8),

    /// Columns or rows outside `1..=1000`
    InvalidDimensions {
        /// Declared column count
        cols: u32,
        /// Declared row count
        rows: u32,
    },

    /// Envelope did not start with the frame magic byte
    BadFrameMagic(u8),

    /// Envelope declared a session ID longer than the frame
    TruncatedFrame {
        /// Declared session ID length
        declared: usize,
        /// Bytes remaining after the length field
        remaining: usize,
    },

    /// Session ID was not valid UTF-8
    InvalidSessionId,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TooShort { needed, actual } => {
                write!(f, "Frame too short: need {} bytes, got {}", needed, actual)
            }
            DecodeError::BadMagic(magic) => {
                write!(f, "Bad snapshot magic: {:02x} {:02x}", magic[0], magic[1])
            }
            DecodeError::BadVersion(v) => write!(f, "Unsupported snapshot version: {}", v),
            DecodeError::InvalidDimensions { cols, rows } => {
                write!(f, "Invalid dimensions: {}x{}", cols, rows)
            }
            DecodeError::BadFrameMagic(b) => write!(f, "Bad frame magic: {:#04x}", b),
            DecodeError::TruncatedFrame {
                declared,
                remaining,
            } => write!(
                f,
                "Truncated frame: session ID declares {} bytes, {} remain",
                declared, remaining
            ),
            DecodeError::InvalidSessionId => write!(f, "Session ID is not valid UTF-8"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;
