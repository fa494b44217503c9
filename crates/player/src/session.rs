//! Session: the single work queue that drives everything.
//!
//! A [`Session`] owns the connection manager and the session context. Channel
//! events from the transport and intents from the presentation layer are
//! taken one at a time and processed to completion, including the reducer
//! transition and any follow-up requests they cause, before the next item.
//!
//! The presentation layer talks to a running session through a
//! [`SessionHandle`]: it submits intents and watches the published snapshot
//! and link status.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};

use battlemap_shared::events;

use crate::application::{ActionService, PlayerAction, SessionContext};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::infrastructure::message_translator::translate;
use crate::infrastructure::messaging::{LinkStatus, LinkStatusObserver, SubscriptionSet};
use crate::infrastructure::websocket::ConnectionManager;
use crate::ports::outbound::{ChannelEvent, Connector};
use crate::state::{GameState, GameStore, LogColor};

/// A local request submitted through a [`SessionHandle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Act(PlayerAction),
    /// Drop the current channel and open a fresh one
    Reconnect,
    Disconnect,
}

impl From<PlayerAction> for Intent {
    fn from(action: PlayerAction) -> Self {
        Intent::Act(action)
    }
}

pub struct Session {
    manager: ConnectionManager<SessionContext>,
    ctx: SessionContext,
    intents: mpsc::UnboundedReceiver<Intent>,
}

impl Session {
    /// Build a session and the handle used to drive it. Nothing is opened
    /// until [`Session::connect`] or an [`Intent::Reconnect`].
    pub fn new(config: &ClientConfig, connector: Box<dyn Connector>) -> (Self, SessionHandle) {
        let mut manager =
            ConnectionManager::new(config.server_url.clone(), connector, config.correlation);
        manager.on_connect(|ctx: &mut SessionContext| {
            ctx.queue(PlayerAction::FetchInfo);
            ctx.queue(PlayerAction::FetchRoster);
        });
        manager.on_error(|reason, ctx: &mut SessionContext| {
            ctx.log(format!("Connection lost: {reason}"), LogColor::Orange);
        });
        manager.on_disconnect(|reason, _ctx: &mut SessionContext| {
            tracing::info!(%reason, "Disconnected from battle server");
        });

        let ctx = SessionContext::new(GameStore::new(GameState::new(config.viewport())));
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            intents: intents_tx,
            state: ctx.store.subscribe(),
            status: manager.status_observer(),
        };

        (
            Self {
                manager,
                ctx,
                intents: intents_rx,
            },
            handle,
        )
    }

    /// Open a channel with a fresh set of push handlers.
    pub fn connect(&mut self) {
        tracing::info!(url = %self.manager.url(), "Connecting to battle server");
        self.manager.reconnect_with(subscriptions());
    }

    pub fn disconnect(&mut self) {
        self.manager.disconnect();
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn state(&self) -> &GameState {
        self.ctx.store.state()
    }

    pub fn status(&self) -> LinkStatus {
        self.manager.status()
    }

    pub fn generation(&self) -> u64 {
        self.manager.generation()
    }

    pub fn pending_requests(&self) -> usize {
        self.manager.pending_count()
    }

    /// Process one local intent.
    pub fn apply(&mut self, intent: Intent) -> Result<()> {
        let result = match intent {
            Intent::Act(action) => ActionService::new(&mut self.manager, &mut self.ctx).perform(action),
            Intent::Reconnect => {
                self.connect();
                Ok(())
            }
            Intent::Disconnect => {
                self.disconnect();
                Ok(())
            }
        };
        self.run_followups();
        result
    }

    /// Process one event from the transport.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        self.manager.handle(event, &mut self.ctx);
        self.run_followups();
    }

    /// Process everything that is already queued without waiting. Returns the
    /// number of items processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        loop {
            if let Some(event) = self.manager.try_next_event() {
                self.handle_channel_event(event);
            } else if let Ok(intent) = self.intents.try_recv() {
                if let Err(e) = self.apply(intent) {
                    tracing::debug!(error = %e, "Intent failed");
                }
            } else {
                return processed;
            }
            processed += 1;
        }
    }

    /// Run until every [`SessionHandle`] is dropped, then disconnect.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.manager.next_event() => self.handle_channel_event(event),
                intent = self.intents.recv() => match intent {
                    Some(intent) => {
                        if let Err(e) = self.apply(intent) {
                            tracing::debug!(error = %e, "Intent failed");
                        }
                    }
                    None => break,
                },
            }
        }
        tracing::info!("All session handles dropped; shutting down");
        self.disconnect();
    }

    fn run_followups(&mut self) {
        while let Some(action) = self.ctx.take_followup() {
            let label = action.label();
            if let Err(e) = ActionService::new(&mut self.manager, &mut self.ctx).perform(action) {
                tracing::warn!(action = label, error = %e, "Follow-up request failed");
            }
        }
    }
}

/// Push handlers for one channel.
fn subscriptions() -> SubscriptionSet<SessionContext> {
    let mut set = SubscriptionSet::new();
    for name in [
        events::CHARACTER_JOIN,
        events::CHARACTER_UPDATE,
        events::GAME_STATUS,
        events::GAME_EVENT,
        events::CREATE_NPCS,
    ] {
        set.register(name, move |payload: &Value, ctx: &mut SessionContext| {
            if let Some(event) = translate(name, payload) {
                ctx.store.dispatch(event);
            }
        });
    }
    set.register(events::RESET, |payload: &Value, ctx: &mut SessionContext| {
        if let Some(event) = translate(events::RESET, payload) {
            ctx.player.character_id = None;
            ctx.store.dispatch(event);
        }
    });
    set
}

/// Cloneable handle to a running [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    intents: mpsc::UnboundedSender<Intent>,
    state: watch::Receiver<Arc<GameState>>,
    status: LinkStatusObserver,
}

impl SessionHandle {
    pub fn send(&self, intent: impl Into<Intent>) -> Result<()> {
        self.intents
            .send(intent.into())
            .map_err(|_| ClientError::SessionClosed)
    }

    pub fn reconnect(&self) -> Result<()> {
        self.send(Intent::Reconnect)
    }

    pub fn disconnect(&self) -> Result<()> {
        self.send(Intent::Disconnect)
    }

    /// Latest published snapshot.
    pub fn state(&self) -> Arc<GameState> {
        Arc::clone(&self.state.borrow())
    }

    /// Receiver that wakes on every new snapshot.
    pub fn watch_state(&self) -> watch::Receiver<Arc<GameState>> {
        self.state.clone()
    }

    pub fn status(&self) -> LinkStatus {
        self.status.status()
    }

    pub fn watch_status(&self) -> LinkStatusObserver {
        self.status.clone()
    }
}
