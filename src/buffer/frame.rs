//! Session framing envelope around snapshot payloads
//!
//! ```text
//! | 0xBF | id_len: u32 LE | session id (UTF-8) | snapshot bytes ... |
//! ```

use super::error::{DecodeError, Result};
use super::reader::ByteReader;
use super::BufferSnapshot;

/// First byte of every enveloped binary frame
pub const FRAME_MAGIC: u8 = 0xBF;

const ENVELOPE_HEADER_LEN: usize = 5;

/// A binary frame split into its session ID and raw snapshot payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub session_id: &'a str,
    pub payload: &'a [u8],
}

impl Frame<'_> {
    /// Decode the payload as a snapshot
    pub fn snapshot(&self) -> Result<BufferSnapshot> {
        super::decode(self.payload)
    }
}

/// Split an enveloped frame. The payload is not decoded.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame<'_>> {
    let mut r = ByteReader::new(bytes);
    let too_short = || DecodeError::TooShort {
        needed: ENVELOPE_HEADER_LEN,
        actual: bytes.len(),
    };

    let magic = r.u8().ok_or_else(too_short)?;
    if magic != FRAME_MAGIC {
        return Err(DecodeError::BadFrameMagic(magic));
    }
    let id_len = r.u32_le().ok_or_else(too_short)? as usize;
    let remaining = r.remaining();
    let id = r.bytes(id_len).ok_or(DecodeError::TruncatedFrame {
        declared: id_len,
        remaining,
    })?;
    let session_id = std::str::from_utf8(id).map_err(|_| DecodeError::InvalidSessionId)?;

    Ok(Frame {
        session_id,
        payload: r.rest(),
    })
}

/// Wrap an encoded snapshot for a session
pub fn encode_frame(session_id: &str, snapshot_bytes: &[u8]) -> Vec<u8> {
    let mut out =
        Vec::with_capacity(ENVELOPE_HEADER_LEN + session_id.len() + snapshot_bytes.len());
    out.push(FRAME_MAGIC);
    out.extend_from_slice(&(session_id.len() as u32).to_le_bytes());
    out.extend_from_slice(session_id.as_bytes());
    out.extend_from_slice(snapshot_bytes);
    out
}
