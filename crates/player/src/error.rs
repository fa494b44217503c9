//! Client error types.
//!
//! These cover the synchronous seams of the client (configuration, opening a
//! channel, queueing a frame, local permission checks). Failures that arrive
//! over the wire are never errors: they become log entries or link status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Server URL is not a usable WebSocket endpoint
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No channel is open
    #[error("Not connected to server")]
    NotConnected,

    /// Channel exists but refused the frame (writer task is gone)
    #[error("Failed to send '{action}': channel closed")]
    SendFailed { action: String },

    /// Environment variable has an unusable value
    #[error("Invalid configuration for {var}: {reason}")]
    Config { var: &'static str, reason: String },

    /// Local role check refused the action before anything was sent
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// The session loop has stopped; intents can no longer be delivered
    #[error("Session is closed")]
    SessionClosed,
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
