//! Mutable session context shared by handlers, callbacks and hooks.

use std::collections::VecDeque;

use battlemap_shared::{PlayerInfo, Role, SelectableCharacter};

use crate::application::dto::PlayerAction;
use crate::state::{GameStore, LogColor, StoreEvent};

/// Who the local user is in this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalPlayer {
    pub role: Role,
    /// The character this player controls, once chosen
    pub character_id: Option<String>,
    pub name: String,
    /// Target of the next targeted action
    pub selected_target: Option<String>,
}

impl LocalPlayer {
    pub fn is_dm(&self) -> bool {
        self.role == Role::Dm
    }

    pub fn owns(&self, character_id: &str) -> bool {
        self.character_id.as_deref() == Some(character_id)
    }

    /// Merge what the server reports in an `info` response.
    pub fn apply_info(&mut self, info: PlayerInfo) {
        self.role = info.role;
        if info.character.is_some() {
            self.character_id = info.character;
        }
        if !info.name.is_empty() {
            self.name = info.name;
        }
    }
}

/// Everything a push handler or response callback may touch.
///
/// Handlers only ever see `&mut SessionContext`; work that needs the
/// connection (follow-up requests) is queued here and run by the session
/// once the current item is finished.
pub struct SessionContext {
    pub store: GameStore,
    pub player: LocalPlayer,
    /// Characters still available for selection
    pub lobby: Vec<SelectableCharacter>,
    followups: VecDeque<PlayerAction>,
}

impl SessionContext {
    pub fn new(store: GameStore) -> Self {
        Self {
            store,
            player: LocalPlayer::default(),
            lobby: Vec::new(),
            followups: VecDeque::new(),
        }
    }

    /// Queue an action to run after the current work item.
    pub fn queue(&mut self, action: PlayerAction) {
        self.followups.push_back(action);
    }

    pub fn take_followup(&mut self) -> Option<PlayerAction> {
        self.followups.pop_front()
    }

    pub fn has_followups(&self) -> bool {
        !self.followups.is_empty()
    }

    /// Append a visible log line.
    pub fn log(&mut self, message: impl Into<String>, color: LogColor) {
        self.store.dispatch(StoreEvent::log(message, color));
    }
}
