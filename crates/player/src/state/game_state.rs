//! Local mirror of the shared battle state.

use std::collections::{BTreeSet, HashMap, VecDeque};

use battlemap_shared::{CharacterData, CharacterKind, GamePhase, Position};
use chrono::{DateTime, Utc};

use crate::coords::{RenderPoint, Viewport};

/// Maximum number of log entries kept (oldest are evicted)
pub const MAX_LOG_ENTRIES: usize = 250;

pub type CharacterId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Vitality {
    #[default]
    Alive,
    Dead,
    Stunned {
        rounds: u32,
    },
}

/// A character as the client tracks it.
///
/// `position` is render space and is what the presentation layer draws.
/// `anchor` is the last authoritative position the server reported; it is
/// kept apart so positions can be re-projected when the surface is resized.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub kind: CharacterKind,
    pub hp: HitPoints,
    pub position: RenderPoint,
    pub anchor: Position,
    pub vitality: Vitality,
    pub active_weapon: Option<String>,
    pub weapons: BTreeSet<String>,
    /// Only meaningful for NPCs
    pub is_ally: bool,
    pub token: Option<String>,
}

impl Character {
    /// Build from a wire payload, placing the token with the given viewport.
    pub fn from_wire(data: CharacterData, viewport: &Viewport) -> Self {
        let vitality = match data.status {
            battlemap_shared::LifeStatus::Alive => Vitality::Alive,
            battlemap_shared::LifeStatus::Dead => Vitality::Dead,
            battlemap_shared::LifeStatus::Stunned => Vitality::Stunned {
                rounds: data.stun_duration,
            },
        };
        Self {
            position: viewport.token_origin(data.pos),
            anchor: data.pos,
            id: data.id,
            name: data.name,
            kind: data.kind,
            hp: HitPoints {
                current: data.hp,
                max: data.max_hp,
            },
            vitality,
            active_weapon: data.active_weapon,
            weapons: data.weapons,
            is_ally: data.is_ally,
            token: data.token,
        }
    }

    /// Name for log messages; falls back to the id for unnamed characters.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn is_dead(&self) -> bool {
        self.vitality == Vitality::Dead
    }
}

/// Display color of a log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogColor {
    /// Neutral
    #[default]
    White,
    /// Death
    Red,
    /// Healing or other good news
    Green,
    /// Warnings such as rejected actions
    Orange,
    /// Status effects
    Yellow,
    /// Incapacitation
    Grey,
}

impl LogColor {
    pub fn as_str(self) -> &'static str {
        match self {
            LogColor::White => "white",
            LogColor::Red => "red",
            LogColor::Green => "green",
            LogColor::Orange => "orange",
            LogColor::Yellow => "yellow",
            LogColor::Grey => "grey",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub message: String,
    pub color: LogColor,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, color: LogColor) -> Self {
        Self {
            timestamp: None,
            message: message.into(),
            color,
        }
    }

    pub fn at(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Snapshot of the shared game state.
///
/// The viewport travels with the snapshot so every reducer transition that
/// places a token uses the geometry current at that point in the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub characters: HashMap<CharacterId, Character>,
    pub log: VecDeque<LogEntry>,
    pub round: u32,
    pub phase: GamePhase,
    pub active_character_id: Option<CharacterId>,
    pub viewport: Viewport,
    /// Entries ever appended, including ones the cap has since dropped.
    pub log_total: u64,
}

impl GameState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            characters: HashMap::new(),
            log: VecDeque::new(),
            round: 0,
            phase: GamePhase::default(),
            active_character_id: None,
            viewport,
            log_total: 0,
        }
    }

    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn active_character(&self) -> Option<&Character> {
        self.active_character_id
            .as_deref()
            .and_then(|id| self.characters.get(id))
    }

    /// Display name for log messages, tolerating ids the map does not know.
    pub(crate) fn name_of(&self, id: &str) -> String {
        self.characters
            .get(id)
            .map(|c| c.display_name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Characters sorted by name, for stable display.
    pub fn roster(&self) -> Vec<&Character> {
        let mut list: Vec<_> = self.characters.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub(crate) fn push_log(&mut self, entry: LogEntry) {
        self.log.push_back(entry);
        self.log_total += 1;
    }

    /// Drop the oldest entries beyond [`MAX_LOG_ENTRIES`].
    pub(crate) fn enforce_log_cap(&mut self) {
        while self.log.len() > MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
    }
}
