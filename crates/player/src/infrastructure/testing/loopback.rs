//! In-memory connector for driving a session without a server.
//!
//! [`LoopbackConnector`] opens channels that go nowhere; the paired
//! [`LoopbackServer`] plays the server side: it reads the frames the client
//! queued and injects pushes, responses and closes into the newest channel.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use battlemap_shared::{Envelope, ResponseResult};

use crate::error::ClientError;
use crate::infrastructure::messaging::ChannelHandle;
use crate::ports::outbound::{ChannelEvent, ChannelEventKind, Connector};

struct LoopbackChannel {
    generation: u64,
    events: mpsc::UnboundedSender<ChannelEvent>,
    outbound: mpsc::UnboundedReceiver<Envelope>,
}

#[derive(Default)]
struct Shared {
    channels: Vec<LoopbackChannel>,
    refuse_next: Option<String>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // A panicking test thread poisons the lock; the data is still usable.
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Client side of the loopback. Every `open` reports `Opened` immediately.
pub struct LoopbackConnector {
    shared: Arc<Mutex<Shared>>,
}

impl LoopbackConnector {
    pub fn new() -> (Self, LoopbackServer) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            LoopbackServer { shared },
        )
    }
}

impl Connector for LoopbackConnector {
    fn open(
        &mut self,
        url: &str,
        generation: u64,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<ChannelHandle, ClientError> {
        let mut shared = lock(&self.shared);
        if let Some(reason) = shared.refuse_next.take() {
            return Err(ClientError::InvalidUrl {
                url: url.to_string(),
                reason,
            });
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _shutdown_rx) = oneshot::channel();
        let _ = events.send(ChannelEvent::new(generation, ChannelEventKind::Opened));
        shared.channels.push(LoopbackChannel {
            generation,
            events,
            outbound: outbound_rx,
        });
        Ok(ChannelHandle::new(outbound_tx, shutdown_tx))
    }
}

/// Server side of the loopback.
#[derive(Clone)]
pub struct LoopbackServer {
    shared: Arc<Mutex<Shared>>,
}

impl LoopbackServer {
    /// How many channels have been opened so far.
    pub fn channels_opened(&self) -> usize {
        lock(&self.shared).channels.len()
    }

    /// Make the next `open` fail with `reason`.
    pub fn refuse_next_open(&self, reason: impl Into<String>) {
        lock(&self.shared).refuse_next = Some(reason.into());
    }

    /// Frames the client queued on the newest channel since the last call.
    pub fn take_frames(&self) -> Vec<Envelope> {
        let mut shared = lock(&self.shared);
        let Some(channel) = shared.channels.last_mut() else {
            return Vec::new();
        };
        let mut frames = Vec::new();
        while let Ok(frame) = channel.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Push an event on the newest channel.
    pub fn push(&self, event: &str, data: Value) {
        self.send_on_latest(ChannelEventKind::Message(Envelope::new(event, data)));
    }

    /// Push an event on a specific (possibly superseded) channel generation.
    pub fn push_on(&self, generation: u64, event: &str, data: Value) {
        let shared = lock(&self.shared);
        if let Some(channel) = shared.channels.iter().find(|c| c.generation == generation) {
            let _ = channel.events.send(ChannelEvent::new(
                generation,
                ChannelEventKind::Message(Envelope::new(event, data)),
            ));
        }
    }

    /// Answer a request frame, echoing its name and token.
    pub fn respond(&self, request: &Envelope, result: ResponseResult) {
        let data = serde_json::to_value(&result).unwrap_or(Value::Null);
        let mut frame = Envelope::new(request.event.clone(), data);
        frame.request_id = request.request_id.clone();
        self.send_on_latest(ChannelEventKind::Message(frame));
    }

    /// Close the newest channel with `code`.
    pub fn close(&self, code: u16) {
        self.send_on_latest(ChannelEventKind::Closed {
            code,
            detail: String::new(),
        });
    }

    pub fn latest_generation(&self) -> Option<u64> {
        lock(&self.shared).channels.last().map(|c| c.generation)
    }

    fn send_on_latest(&self, kind: ChannelEventKind) {
        let shared = lock(&self.shared);
        if let Some(channel) = shared.channels.last() {
            let _ = channel
                .events
                .send(ChannelEvent::new(channel.generation, kind));
        }
    }
}
