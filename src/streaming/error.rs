//! Error types for the narration transport

use std::fmt;

/// Errors from the WebSocket transport.
///
/// None of these are fatal to a session: the client turns them into a
/// `Disconnected` state transition and schedules a reconnect.
#[derive(Debug)]
pub enum TransportError {
    /// URL could not be parsed or uses an unsupported scheme
    InvalidUrl(String),

    /// WebSocket protocol or handshake error
    WebSocket(String),

    /// IO error
    Io(std::io::Error),

    /// Serialization/deserialization error
    Serialization(serde_json::Error),

    /// Connection closed by the remote end
    ConnectionClosed,

    /// Token provider failed
    Authentication(String),

    /// Operation needs a live connection
    NotConnected,

    /// Handshake or keepalive exceeded its deadline
    Timeout(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            TransportError::WebSocket(msg) => write!(f, "WebSocket error: {}", msg),
            TransportError::Io(err) => write!(f, "IO error: {}", err),
            TransportError::Serialization(err) => write!(f, "Serialization error: {}", err),
            TransportError::ConnectionClosed => write!(f, "Connection closed"),
            TransportError::Authentication(msg) => write!(f, "Authentication failed: {}", msg),
            TransportError::NotConnected => write!(f, "Not connected"),
            TransportError::Timeout(what) => write!(f, "Timed out: {}", what),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(err) => Some(err),
            TransportError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err)
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::ConnectionClosed,
            WsError::Io(io) => TransportError::Io(io),
            other => TransportError::WebSocket(other.to_string()),
        }
    }
}

/// Problems with an inbound control message. Logged and skipped.
#[derive(Debug)]
pub enum ProtocolError {
    /// Text frame was not a valid control message
    Malformed(serde_json::Error),

    /// A frame of a kind the client does not handle
    UnexpectedFrame(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(err) => write!(f, "Malformed control message: {}", err),
            ProtocolError::UnexpectedFrame(what) => write!(f, "Unexpected frame: {}", what),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Malformed(err) => Some(err),
            ProtocolError::UnexpectedFrame(_) => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err)
    }
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
