//! Connection lifecycle management.
//!
//! This module provides types for observing the channel to the battle server:
//! connection state, decoded close reasons, and the handle used to tear a
//! channel down.

use std::fmt;

use tokio::sync::{mpsc, oneshot, watch};

use battlemap_shared::Envelope;

/// Close code reported when the peer closed without a status.
pub const NO_STATUS_CODE: u16 = 1005;
/// Close code reported when the transport failed without a close frame.
pub const ABNORMAL_CLOSURE_CODE: u16 = 1006;

/// Connection state of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the server
    #[default]
    Disconnected,
    /// Channel opened, waiting for the handshake to finish
    Connecting,
    /// Successfully connected
    Connected,
    /// Channel closed with an error; only an explicit reconnect recovers
    Failed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

/// Human-readable text for a WebSocket close code.
pub fn describe_close_code(code: u16) -> &'static str {
    match code {
        1000 => "Normal closure: the purpose of the connection has been fulfilled",
        1001 => "Going away: the server is shutting down or the client navigated away",
        1002 => "Protocol error",
        1003 => "Unsupported data: received a type of data the endpoint cannot accept",
        1004 => "Reserved",
        1005 => "No status code was present",
        1006 => "Abnormal closure: the connection dropped without a close frame",
        1007 => "Inconsistent data: message content did not match its type",
        1008 => "Policy violation",
        1009 => "Message too big to process",
        1010 => "Extension negotiation failed: the server did not accept a required extension",
        1011 => "Internal server error: the server hit an unexpected condition",
        1015 => "TLS handshake failure",
        _ => "Unknown reason",
    }
}

/// Why a channel ended, decoded for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub description: &'static str,
    /// Transport detail (close frame text or I/O error), when there is one
    pub detail: Option<String>,
}

impl CloseReason {
    pub fn from_code(code: u16) -> Self {
        Self {
            code,
            description: describe_close_code(code),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.detail = (!detail.is_empty()).then_some(detail);
        self
    }

    /// Normal closure is the only code that is not an error.
    pub fn is_clean(&self) -> bool {
        self.code == 1000
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description, self.code)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// What the presentation layer shows about the link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: ConnectionState,
    pub last_error: Option<CloseReason>,
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Read-only view of the link status.
#[derive(Clone)]
pub struct LinkStatusObserver {
    rx: watch::Receiver<LinkStatus>,
}

impl LinkStatusObserver {
    pub fn new(rx: watch::Receiver<LinkStatus>) -> Self {
        Self { rx }
    }

    pub fn status(&self) -> LinkStatus {
        self.rx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.rx.borrow().is_connected()
    }

    /// Wait for the next status change. Returns `None` once the session is gone.
    pub async fn changed(&mut self) -> Option<LinkStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Handle to one open channel.
///
/// Frames queued with [`ChannelHandle::send`] are written by the transport's
/// writer task. [`ChannelHandle::close`] consumes the handle; a closed channel
/// is never reused.
pub struct ChannelHandle {
    outbound: mpsc::UnboundedSender<Envelope>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ChannelHandle {
    pub fn new(outbound: mpsc::UnboundedSender<Envelope>, shutdown_tx: oneshot::Sender<()>) -> Self {
        Self {
            outbound,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Queue a frame. Fails only when the writer side is gone.
    pub fn send(&self, frame: Envelope) -> Result<(), Envelope> {
        self.outbound.send(frame).map_err(|e| e.0)
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Ask the transport to close the channel.
    pub fn close(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_code_table_covers_standard_codes() {
        for code in (1000..=1011).chain([1015]) {
            assert_ne!(describe_close_code(code), "Unknown reason", "code {code}");
        }
        assert_eq!(describe_close_code(1004), "Reserved");
    }

    #[test]
    fn unrecognized_close_codes_are_unknown() {
        for code in [0, 999, 1012, 1013, 1014, 1016, 4000] {
            assert_eq!(describe_close_code(code), "Unknown reason", "code {code}");
        }
    }

    #[test]
    fn close_reason_display_includes_detail() {
        let reason = CloseReason::from_code(1006).with_detail("connection reset");
        assert!(!reason.is_clean());
        assert_eq!(
            reason.to_string(),
            "Abnormal closure: the connection dropped without a close frame (1006): connection reset"
        );
        assert_eq!(CloseReason::from_code(1000).with_detail("").detail, None);
    }

    #[test]
    fn observer_reads_latest_status() {
        let (tx, rx) = watch::channel(LinkStatus::default());
        let observer = LinkStatusObserver::new(rx);
        assert!(!observer.is_connected());

        tx.send_replace(LinkStatus {
            state: ConnectionState::Connected,
            last_error: None,
        });
        assert!(observer.is_connected());
    }

    #[tokio::test]
    async fn closing_handle_signals_shutdown() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = ChannelHandle::new(out_tx, shutdown_tx);

        handle
            .send(Envelope::new("dash", serde_json::json!({})))
            .expect("queued");
        assert_eq!(out_rx.recv().await.map(|f| f.event), Some("dash".to_string()));

        handle.close();
        assert!(shutdown_rx.await.is_ok());
    }
}
