//! Connection manager: one logical channel to the battle server.
//!
//! The manager owns the current channel, the subscription set bound to it, and
//! the table of pending one-shot callbacks. Transport tasks never touch any of
//! these directly; they post [`ChannelEvent`]s into the manager's inbound queue
//! and the session feeds each event back through [`ConnectionManager::handle`]
//! together with its context.
//!
//! Every channel gets a new generation number. Events from an older
//! generation are dropped, so after [`ConnectionManager::reconnect_with`] no
//! frame from the previous channel can reach the new handlers.

use serde_json::Value;
use tokio::sync::{mpsc, watch};

use battlemap_shared::{ClientRequest, ResponseResult};

use crate::error::{ClientError, Result};
use crate::infrastructure::messaging::connection::ABNORMAL_CLOSURE_CODE;
use crate::infrastructure::messaging::{
    request_frame, ChannelHandle, CloseReason, ConnectionState, CorrelationPolicy, LinkStatus,
    LinkStatusObserver, PendingRequests, ResponseCallback, SubscriptionSet,
};
use crate::ports::outbound::{ChannelEvent, ChannelEventKind, Connector};

type ConnectHook<C> = Box<dyn FnMut(&mut C) + Send + 'static>;
type CloseHook<C> = Box<dyn FnMut(&CloseReason, &mut C) + Send + 'static>;

struct LifecycleHooks<C> {
    on_connect: Option<ConnectHook<C>>,
    on_disconnect: Option<CloseHook<C>>,
    on_error: Option<CloseHook<C>>,
}

pub struct ConnectionManager<C> {
    url: String,
    connector: Box<dyn Connector>,
    channel: Option<ChannelHandle>,
    generation: u64,
    subscriptions: SubscriptionSet<C>,
    pending: PendingRequests<C>,
    hooks: LifecycleHooks<C>,
    status_tx: watch::Sender<LinkStatus>,
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
    events_rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl<C> ConnectionManager<C> {
    /// Create a manager. No channel is opened until [`ConnectionManager::reconnect`].
    pub fn new(
        url: impl Into<String>,
        connector: Box<dyn Connector>,
        policy: CorrelationPolicy,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(LinkStatus::default());
        Self {
            url: url.into(),
            connector,
            channel: None,
            generation: 0,
            subscriptions: SubscriptionSet::new(),
            pending: PendingRequests::new(policy),
            hooks: LifecycleHooks {
                on_connect: None,
                on_disconnect: None,
                on_error: None,
            },
            status_tx,
            events_tx,
            events_rx,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn policy(&self) -> CorrelationPolicy {
        self.pending.policy()
    }

    pub fn status(&self) -> LinkStatus {
        self.status_tx.borrow().clone()
    }

    pub fn status_observer(&self) -> LinkStatusObserver {
        LinkStatusObserver::new(self.status_tx.subscribe())
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some() && self.status_tx.borrow().is_connected()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Next event from any channel. Never returns `None` while the manager
    /// lives, since it keeps a sender for itself.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events_rx.recv().await
    }

    /// Next queued event, without waiting.
    pub fn try_next_event(&mut self) -> Option<ChannelEvent> {
        self.events_rx.try_recv().ok()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Tear down the current channel and all subscriptions, then open a new
    /// channel with no handlers registered.
    pub fn reconnect(&mut self) {
        self.reconnect_with(SubscriptionSet::new());
    }

    /// Tear down the current channel and open a new one bound to
    /// `subscriptions`.
    ///
    /// The previous set is dropped in the same step the new one is installed,
    /// before the new channel can deliver anything. Pending callbacks belong
    /// to the old channel and are discarded.
    pub fn reconnect_with(&mut self, subscriptions: SubscriptionSet<C>) {
        self.teardown();
        self.subscriptions = subscriptions;
        self.generation += 1;

        tracing::info!(url = %self.url, generation = self.generation, "Opening channel");
        self.set_status(ConnectionState::Connecting, None);

        match self
            .connector
            .open(&self.url, self.generation, self.events_tx.clone())
        {
            Ok(handle) => self.channel = Some(handle),
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Failed to open channel");
                // Reported through the queue so hooks run in order with everything else.
                let _ = self.events_tx.send(ChannelEvent::new(
                    self.generation,
                    ChannelEventKind::Failed {
                        code: ABNORMAL_CLOSURE_CODE,
                        detail: e.to_string(),
                    },
                ));
            }
        }
    }

    /// Close the channel on request. Late events from it are ignored.
    pub fn disconnect(&mut self) {
        self.teardown();
        self.generation += 1;
        self.set_status(ConnectionState::Disconnected, None);
    }

    fn teardown(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        let dropped = self.pending.clear();
        if dropped > 0 {
            tracing::debug!(count = dropped, "Cleared pending requests on teardown");
        }
        self.subscriptions.clear();
    }

    pub fn on_connect(&mut self, hook: impl FnMut(&mut C) + Send + 'static) {
        self.hooks.on_connect = Some(Box::new(hook));
    }

    pub fn on_disconnect(&mut self, hook: impl FnMut(&CloseReason, &mut C) + Send + 'static) {
        self.hooks.on_disconnect = Some(Box::new(hook));
    }

    pub fn on_error(&mut self, hook: impl FnMut(&CloseReason, &mut C) + Send + 'static) {
        self.hooks.on_error = Some(Box::new(hook));
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Persistent subscription on the current channel. Replaces any handler
    /// already registered under `name`.
    pub fn register_event(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&Value, &mut C) + Send + 'static,
    ) {
        self.subscriptions.register(name, handler);
    }

    pub fn unregister_event(&mut self, name: &str) -> bool {
        self.subscriptions.unregister(name)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send a request. The callback, if any, is registered before the frame
    /// is queued and fires once on the matching response.
    pub fn send_request(
        &mut self,
        request: &ClientRequest,
        callback: Option<ResponseCallback<C>>,
    ) -> Result<()> {
        let action = request.action();
        let Some(channel) = self.channel.as_ref() else {
            tracing::warn!(action = %action, "Request dropped: not connected");
            return Err(ClientError::NotConnected);
        };

        let (token, registered) = match callback {
            Some(callback) => (self.pending.insert(action, callback), true),
            None => (self.pending.fire_and_forget_token(), false),
        };

        let frame = request_frame(request, token.clone());
        tracing::debug!(action = %action, request_id = ?token, "Sending request");
        if channel.send(frame).is_err() {
            if registered {
                self.pending.remove(token.as_deref().unwrap_or(action));
            }
            tracing::error!(action = %action, "Channel writer is gone");
            return Err(ClientError::SendFailed {
                action: action.to_string(),
            });
        }
        Ok(())
    }

    /// [`ConnectionManager::send_request`] with a closure callback.
    pub fn request(
        &mut self,
        request: &ClientRequest,
        callback: impl FnOnce(ResponseResult, &mut C) + Send + 'static,
    ) -> Result<()> {
        self.send_request(request, Some(Box::new(callback)))
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Process one event from the inbound queue.
    pub fn handle(&mut self, event: ChannelEvent, ctx: &mut C) {
        if event.generation != self.generation {
            tracing::debug!(
                generation = event.generation,
                current = self.generation,
                "Dropping event from superseded channel"
            );
            return;
        }

        match event.kind {
            ChannelEventKind::Opened => {
                self.set_status(ConnectionState::Connected, None);
                if let Some(hook) = self.hooks.on_connect.as_mut() {
                    hook(ctx);
                }
            }
            ChannelEventKind::Message(frame) => {
                let mut handled = false;
                if let Some(callback) = self.pending.take_for(&frame) {
                    callback(ResponseResult::from_payload(&frame.data), ctx);
                    handled = true;
                }
                handled |= self.subscriptions.dispatch(&frame.event, &frame.data, ctx);
                if !handled {
                    tracing::debug!(event = %frame.event, "No handler for inbound event");
                }
            }
            ChannelEventKind::Closed { code, detail } => {
                self.channel = None;
                let reason = CloseReason::from_code(code).with_detail(detail);
                if reason.is_clean() {
                    tracing::info!(%reason, "Channel closed");
                    self.set_status(ConnectionState::Disconnected, None);
                } else {
                    tracing::warn!(%reason, "Channel closed with error");
                    self.set_status(ConnectionState::Failed, Some(reason.clone()));
                    if let Some(hook) = self.hooks.on_error.as_mut() {
                        hook(&reason, ctx);
                    }
                }
                if let Some(hook) = self.hooks.on_disconnect.as_mut() {
                    hook(&reason, ctx);
                }
            }
            ChannelEventKind::Failed { code, detail } => {
                self.channel = None;
                let reason = CloseReason::from_code(code).with_detail(detail);
                tracing::error!(%reason, "Channel failed");
                self.set_status(ConnectionState::Failed, Some(reason.clone()));
                if let Some(hook) = self.hooks.on_error.as_mut() {
                    hook(&reason, ctx);
                }
            }
        }
    }

    fn set_status(&self, state: ConnectionState, last_error: Option<CloseReason>) {
        self.status_tx.send_modify(|status| {
            status.state = state;
            if last_error.is_some() || state == ConnectionState::Connected {
                status.last_error = last_error;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::MockConnector;
    use battlemap_shared::{Envelope, Position};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Ctx {
        seen: Vec<String>,
    }

    type Outbound = Arc<Mutex<Vec<mpsc::UnboundedReceiver<Envelope>>>>;

    /// Connector that hands out channels and keeps their outbound receivers.
    fn recording_connector(outbound: Outbound) -> MockConnector {
        let mut connector = MockConnector::new();
        connector.expect_open().returning(move |_url, _gen, _events| {
            let (tx, rx) = mpsc::unbounded_channel();
            let (shutdown_tx, _shutdown_rx) = tokio::sync::oneshot::channel();
            outbound.lock().expect("lock").push(rx);
            Ok(ChannelHandle::new(tx, shutdown_tx))
        });
        connector
    }

    fn manager(policy: CorrelationPolicy) -> (ConnectionManager<Ctx>, Outbound) {
        let outbound = Arc::new(Mutex::new(Vec::new()));
        let connector = recording_connector(Arc::clone(&outbound));
        let mut manager = ConnectionManager::new("ws://test/ws", Box::new(connector), policy);
        manager.reconnect();
        (manager, outbound)
    }

    fn message(generation: u64, event: &str, data: Value) -> ChannelEvent {
        ChannelEvent::new(generation, ChannelEventKind::Message(Envelope::new(event, data)))
    }

    #[test]
    fn per_action_only_latest_callback_fires() {
        let (mut manager, _outbound) = manager(CorrelationPolicy::PerAction);
        let gen = manager.generation();
        let mut ctx = Ctx::default();

        let move_to = |x| ClientRequest::Move {
            pos: Position::new(x, x),
        };
        manager
            .request(&move_to(1), |_, ctx: &mut Ctx| ctx.seen.push("cb1".into()))
            .expect("sent");
        manager
            .request(&move_to(2), |_, ctx: &mut Ctx| ctx.seen.push("cb2".into()))
            .expect("sent");

        manager.handle(message(gen, "move", json!({"success": true})), &mut ctx);
        manager.handle(message(gen, "move", json!({"success": true})), &mut ctx);
        assert_eq!(ctx.seen, vec!["cb2".to_string()]);
    }

    #[test]
    fn per_request_frames_carry_tokens() {
        let (mut manager, outbound) = manager(CorrelationPolicy::PerRequest);
        manager
            .request(&ClientRequest::Dash, |_, _: &mut Ctx| {})
            .expect("sent");
        let frame = {
            let mut channels = outbound.lock().expect("lock");
            channels[0].try_recv().expect("frame")
        };
        assert_eq!(frame.event, "dash");
        assert!(frame.request_id.is_some());
        assert_eq!(manager.pending_count(), 1);
    }

    #[test]
    fn response_runs_callback_then_subscriber() {
        let (mut manager, _outbound) = manager(CorrelationPolicy::PerAction);
        let gen = manager.generation();
        let mut ctx = Ctx::default();

        manager.register_event("createNPCs", |_, ctx: &mut Ctx| ctx.seen.push("push".into()));
        manager
            .request(
                &ClientRequest::CreateNpcs {
                    amount: 2,
                    allies: false,
                },
                |result, ctx: &mut Ctx| ctx.seen.push(format!("cb:{}", result.success)),
            )
            .expect("sent");

        manager.handle(message(gen, "createNPCs", json!({"success": true})), &mut ctx);
        assert_eq!(ctx.seen, vec!["cb:true".to_string(), "push".to_string()]);
    }

    #[test]
    fn reconnect_drops_old_subscriptions_and_stale_events() {
        let (mut manager, outbound) = manager(CorrelationPolicy::PerRequest);
        let old_gen = manager.generation();
        let mut ctx = Ctx::default();

        manager.register_event("gameEvent", |_, ctx: &mut Ctx| ctx.seen.push("old".into()));
        manager
            .request(&ClientRequest::Info, |_, ctx: &mut Ctx| ctx.seen.push("info".into()))
            .expect("sent");

        let fresh = SubscriptionSet::new().with("gameEvent", |_, ctx: &mut Ctx| {
            ctx.seen.push("new".into())
        });
        manager.reconnect_with(fresh);
        let new_gen = manager.generation();
        assert_ne!(old_gen, new_gen);
        assert_eq!(manager.pending_count(), 0);
        assert_eq!(outbound.lock().expect("lock").len(), 2);

        manager.handle(message(old_gen, "gameEvent", json!({})), &mut ctx);
        manager.handle(message(new_gen, "gameEvent", json!({})), &mut ctx);
        manager.handle(message(new_gen, "info", json!({"success": true})), &mut ctx);
        assert_eq!(ctx.seen, vec!["new".to_string()]);
    }

    #[test]
    fn unregister_stops_delivery() {
        let (mut manager, _outbound) = manager(CorrelationPolicy::PerRequest);
        let gen = manager.generation();
        let mut ctx = Ctx::default();
        manager.register_event("reset", |_, ctx: &mut Ctx| ctx.seen.push("reset".into()));
        assert!(manager.unregister_event("reset"));
        manager.handle(message(gen, "reset", json!({})), &mut ctx);
        assert!(ctx.seen.is_empty());
    }

    #[test]
    fn lifecycle_hooks_and_status() {
        let (mut manager, _outbound) = manager(CorrelationPolicy::PerRequest);
        let gen = manager.generation();
        let mut ctx = Ctx::default();
        manager.on_connect(|ctx: &mut Ctx| ctx.seen.push("connect".into()));
        manager.on_error(|reason, ctx: &mut Ctx| ctx.seen.push(format!("error:{}", reason.code)));
        manager.on_disconnect(|reason, ctx: &mut Ctx| {
            ctx.seen.push(format!("disconnect:{}", reason.code))
        });
        assert_eq!(manager.status().state, ConnectionState::Connecting);

        manager.handle(ChannelEvent::new(gen, ChannelEventKind::Opened), &mut ctx);
        assert!(manager.is_connected());

        manager.handle(
            ChannelEvent::new(
                gen,
                ChannelEventKind::Closed {
                    code: 1011,
                    detail: String::new(),
                },
            ),
            &mut ctx,
        );
        let status = manager.status();
        assert_eq!(status.state, ConnectionState::Failed);
        assert_eq!(status.last_error.map(|r| r.code), Some(1011));
        assert_eq!(
            ctx.seen,
            vec!["connect".to_string(), "error:1011".into(), "disconnect:1011".into()]
        );
        assert!(matches!(
            manager.send_request(&ClientRequest::Dash, None),
            Err(ClientError::NotConnected)
        ));
    }

    #[test]
    fn clean_close_is_not_an_error() {
        let (mut manager, _outbound) = manager(CorrelationPolicy::PerRequest);
        let gen = manager.generation();
        let mut ctx = Ctx::default();
        manager.on_error(|_, ctx: &mut Ctx| ctx.seen.push("error".into()));
        manager.handle(
            ChannelEvent::new(
                gen,
                ChannelEventKind::Closed {
                    code: 1000,
                    detail: String::new(),
                },
            ),
            &mut ctx,
        );
        assert_eq!(manager.status().state, ConnectionState::Disconnected);
        assert_eq!(manager.status().last_error, None);
        assert!(ctx.seen.is_empty());
    }

    #[tokio::test]
    async fn open_failure_is_reported_through_queue() {
        let mut connector = MockConnector::new();
        connector.expect_open().returning(|url, _, _| {
            Err(ClientError::InvalidUrl {
                url: url.to_string(),
                reason: "bad".into(),
            })
        });
        let mut manager: ConnectionManager<Ctx> = ConnectionManager::new(
            "http://nope",
            Box::new(connector),
            CorrelationPolicy::PerRequest,
        );
        manager.reconnect();

        let event = manager.next_event().await.expect("event");
        assert!(matches!(event.kind, ChannelEventKind::Failed { code: 1006, .. }));

        let mut ctx = Ctx::default();
        manager.handle(event, &mut ctx);
        assert_eq!(manager.status().state, ConnectionState::Failed);
    }
}
