//! Control message definitions for the narration transport
//!
//! Control messages are JSON objects carried in WebSocket text frames and
//! discriminated by their `type` field. Screen snapshots travel separately
//! as binary frames (see [`crate::buffer::frame`]).

use super::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Messages sent from the client to the streaming host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Start receiving frames for a session
    Subscribe {
        #[serde(rename = "sessionId")]
        session_id: String,
    },

    /// Stop receiving frames for a session
    Unsubscribe {
        #[serde(rename = "sessionId")]
        session_id: String,
    },

    /// Application-level keepalive
    Ping,

    /// Reply to a server ping
    Pong,
}

impl ClientMessage {
    /// Create a subscribe message
    pub fn subscribe(session_id: impl Into<String>) -> Self {
        Self::Subscribe {
            session_id: session_id.into(),
        }
    }

    /// Create an unsubscribe message
    pub fn unsubscribe(session_id: impl Into<String>) -> Self {
        Self::Unsubscribe {
            session_id: session_id.into(),
        }
    }

    /// Create a ping message
    pub fn ping() -> Self {
        Self::Ping
    }

    /// Create a pong message
    pub fn pong() -> Self {
        Self::Pong
    }

    /// Serialize to the JSON text sent on the wire
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Messages received from the streaming host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Keepalive probe, answered with a pong
    Ping,

    /// Reply to our ping
    Pong,

    /// Error reported by the host
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Raw PTY output for a session, fed to the emulator
    Output {
        #[serde(rename = "sessionId")]
        session_id: String,
        data: String,
    },

    /// Session terminal size changed
    Resize {
        #[serde(rename = "sessionId")]
        session_id: String,
        cols: u16,
        rows: u16,
    },

    /// Any message type this client does not know
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Create a new error message
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code: None,
        }
    }

    /// Create a new output message
    pub fn output(session_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Output {
            session_id: session_id.into(),
            data: data.into(),
        }
    }

    /// Create a new resize message
    pub fn resize(session_id: impl Into<String>, cols: u16, rows: u16) -> Self {
        Self::Resize {
            session_id: session_id.into(),
            cols,
            rows,
        }
    }

    /// Session this message is about, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Output { session_id, .. } | Self::Resize { session_id, .. } => Some(session_id),
            _ => None,
        }
    }
}
