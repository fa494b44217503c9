//! Connector port - opening duplex channels to the battle server.

use tokio::sync::mpsc;

use battlemap_shared::Envelope;

use crate::error::ClientError;
use crate::infrastructure::messaging::ChannelHandle;

/// Something that happened on a channel, tagged with the generation of the
/// channel it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    pub generation: u64,
    pub kind: ChannelEventKind,
}

impl ChannelEvent {
    pub fn new(generation: u64, kind: ChannelEventKind) -> Self {
        Self { generation, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEventKind {
    /// Handshake finished; frames can flow
    Opened,
    /// One decoded inbound frame
    Message(Envelope),
    /// Peer sent a close frame (or closed without one, code 1005)
    Closed { code: u16, detail: String },
    /// Transport failed or could not be established
    Failed { code: u16, detail: String },
}

/// Opens channels.
///
/// Implementations report everything that happens on the channel through
/// `events`, tagged with `generation`, and write frames queued on the returned
/// handle. `open` must not block; connection progress is reported as events.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Connector: Send {
    fn open(
        &mut self,
        url: &str,
        generation: u64,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<ChannelHandle, ClientError>;
}
