//! Persistent named-event subscriptions.
//!
//! A [`SubscriptionSet`] maps event names to handlers. The connection manager
//! owns exactly one set per channel and swaps it wholesale on reconnect, so a
//! handler registered against an old channel can never see frames from the
//! new one.

use std::collections::HashMap;

use serde_json::Value;

/// Push-event handler. Receives the frame payload and the session context.
pub type EventHandler<C> = Box<dyn FnMut(&Value, &mut C) + Send + 'static>;

/// Handlers keyed by event name. One handler per name.
pub struct SubscriptionSet<C> {
    handlers: HashMap<String, EventHandler<C>>,
}

impl<C> SubscriptionSet<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Builder form of [`SubscriptionSet::register`].
    pub fn with(
        mut self,
        name: impl Into<String>,
        handler: impl FnMut(&Value, &mut C) + Send + 'static,
    ) -> Self {
        self.register(name, handler);
        self
    }

    /// Subscribe `handler` to `name`, replacing any earlier handler.
    /// Returns true if a handler was replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&Value, &mut C) + Send + 'static,
    ) -> bool {
        let name = name.into();
        let replaced = self.handlers.insert(name.clone(), Box::new(handler)).is_some();
        if replaced {
            tracing::debug!(event = %name, "Replaced existing event handler");
        }
        replaced
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    /// Deliver a payload to the handler for `name`. Returns whether one ran.
    pub fn dispatch(&mut self, name: &str, payload: &Value, ctx: &mut C) -> bool {
        match self.handlers.get_mut(name) {
            Some(handler) => {
                handler(payload, ctx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<C> Default for SubscriptionSet<C> {
    fn default() -> Self {
        Self::new()
    }
}
