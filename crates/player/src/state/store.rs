//! Owner of the current snapshot.

use std::sync::Arc;

use tokio::sync::watch;

use super::game_state::GameState;
use super::reducer::{reduce, StoreEvent};

/// Holds the latest [`GameState`] and publishes every new snapshot.
///
/// The store is the only writer. Readers either borrow the current snapshot or
/// hold a [`watch::Receiver`] and re-render when it changes.
pub struct GameStore {
    current: Arc<GameState>,
    tx: watch::Sender<Arc<GameState>>,
    /// Set once tokens have been shown unscaled; cleared by a measurement.
    warned_unmeasured: bool,
}

impl GameStore {
    pub fn new(initial: GameState) -> Self {
        let current = Arc::new(initial);
        let (tx, _rx) = watch::channel(Arc::clone(&current));
        Self {
            current,
            tx,
            warned_unmeasured: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.current
    }

    pub fn snapshot(&self) -> Arc<GameState> {
        Arc::clone(&self.current)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<GameState>> {
        self.tx.subscribe()
    }

    /// Run one transition and publish the result.
    pub fn dispatch(&mut self, event: StoreEvent) {
        let next = reduce(GameState::clone(&self.current), event);
        self.current = Arc::new(next);
        self.tx.send_replace(Arc::clone(&self.current));
        self.check_geometry();
    }

    /// Warn once per stretch in which tokens sit on an unmeasured surface.
    fn check_geometry(&mut self) {
        let state = &self.current;
        if state.viewport.is_measured() {
            self.warned_unmeasured = false;
        } else if !state.characters.is_empty() && !self.warned_unmeasured {
            tracing::warn!(
                characters = state.characters.len(),
                "Map surface not measured yet; token positions are unscaled until the first resize"
            );
            self.warned_unmeasured = true;
        }
    }
}
