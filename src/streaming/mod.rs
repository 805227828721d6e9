//! WebSocket transport to a terminal streaming host
//!
//! The host pushes enveloped binary snapshots and JSON control messages;
//! [`TransportClient`] authenticates, subscribes, keeps the connection alive
//! and reconnects with exponential backoff when it drops.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;

pub use auth::{StaticToken, TokenError, TokenProvider};
pub use client::{ConnectionState, EventHandler, SessionEvent, TransportClient};
pub use config::{ReconnectPolicy, TransportConfig, DEFAULT_URL};
pub use error::{ProtocolError, Result, TransportError};
pub use protocol::{ClientMessage, ServerMessage};
