//! Pure state transitions.
//!
//! [`reduce`] is the only code that produces a new [`GameState`]. It reads
//! nothing but its two arguments, so every transition can be tested without a
//! connection or a runtime.

use battlemap_shared::{CharacterData, GameEvent, GameEventKind, GameStatusData, Position};
use chrono::{DateTime, Utc};

use super::game_state::{Character, GameState, LogColor, LogEntry, Vitality};
use crate::coords::Size;

/// Everything that can change the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A tagged `gameEvent` (also used for `characterJoin` pushes)
    Game(GameEvent),
    /// Full overwrite of one character, no log entry
    CharacterUpdate(CharacterData),
    GameStatus(GameStatusData),
    /// The render surface was measured again
    SurfaceResized(Size),
    /// Local notice appended verbatim
    LogMessage(LogEntry),
    /// Server reset the game
    Reset,
}

impl StoreEvent {
    pub fn game(kind: GameEventKind) -> Self {
        StoreEvent::Game(GameEvent {
            timestamp: None,
            kind,
        })
    }

    pub fn log(message: impl Into<String>, color: LogColor) -> Self {
        StoreEvent::LogMessage(LogEntry::new(message, color))
    }
}

/// Apply one event to a snapshot.
pub fn reduce(mut state: GameState, event: StoreEvent) -> GameState {
    match event {
        StoreEvent::Game(GameEvent { timestamp, kind }) => {
            apply_game_event(&mut state, timestamp, kind)
        }
        StoreEvent::CharacterUpdate(data) => upsert(&mut state, data),
        StoreEvent::GameStatus(status) => {
            state.round = status.round;
            state.phase = status.phase;
            state.active_character_id = status.active_char;
        }
        StoreEvent::SurfaceResized(surface) => {
            if state.viewport.resize(surface) {
                let viewport = state.viewport;
                for character in state.characters.values_mut() {
                    character.position = viewport.token_origin(character.anchor);
                }
            }
        }
        StoreEvent::LogMessage(entry) => state.push_log(entry),
        StoreEvent::Reset => {
            let log_total = state.log_total;
            state = GameState::new(state.viewport);
            state.log_total = log_total;
        }
    }

    if let Some(id) = &state.active_character_id {
        if !state.characters.contains_key(id) {
            state.active_character_id = None;
        }
    }
    state.enforce_log_cap();
    state
}

fn apply_game_event(
    state: &mut GameState,
    timestamp: Option<DateTime<Utc>>,
    kind: GameEventKind,
) {
    let log = |state: &mut GameState, message: String, color: LogColor| {
        state.push_log(LogEntry::new(message, color).at(timestamp));
    };

    match kind {
        GameEventKind::CharacterJoin { character } => {
            let message = format!("{} joined the battle", display_name(&character));
            upsert(state, character);
            log(state, message, LogColor::Green);
        }
        GameEventKind::CharacterMove { character_id, to }
        | GameEventKind::CharacterPlace { character_id, to } => {
            relocate(state, &character_id, to);
        }
        GameEventKind::SetAllCharacters { characters } => {
            state.characters.clear();
            for character in characters {
                upsert(state, character);
            }
        }
        GameEventKind::CharactersSpawned { characters } => {
            for character in characters {
                upsert(state, character);
            }
        }
        GameEventKind::CharacterDied {
            character_id,
            reason,
        } => {
            if let Some(c) = state.characters.get_mut(&character_id) {
                c.vitality = Vitality::Dead;
            }
            let message = format!("{} died, reason={}", state.name_of(&character_id), reason);
            log(state, message, LogColor::Red);
        }
        GameEventKind::CharacterAttack {
            attacker,
            victim,
            hit,
            damage,
        } => {
            if let Some(c) = state.characters.get_mut(&victim) {
                c.hp.current = c.hp.current.saturating_sub(damage);
            }
            let message = format!(
                "{} hit {} with a {} for {} damage!",
                state.name_of(&attacker),
                state.name_of(&victim),
                hit,
                damage
            );
            log(state, message, LogColor::White);
        }
        GameEventKind::CharacterSurvived {
            character_id,
            hp,
            reason,
        } => {
            if let Some(c) = state.characters.get_mut(&character_id) {
                c.hp.current = hp;
            }
            let message = if reason.is_empty() {
                format!("{} survived", state.name_of(&character_id))
            } else {
                reason
            };
            log(state, message, LogColor::Green);
        }
        GameEventKind::CharacterKo { character_id } => {
            let message = format!("{} was knocked out", state.name_of(&character_id));
            log(state, message, LogColor::Grey);
        }
        GameEventKind::CharacterDeathRoll { character_id, roll } => {
            let message = format!(
                "{} rolled {} on a death saving throw",
                state.name_of(&character_id),
                roll
            );
            log(state, message, LogColor::White);
        }
        GameEventKind::CharacterStunned {
            character_id,
            duration,
        } => {
            let message = format!(
                "{} is stunned for {} rounds",
                state.name_of(&character_id),
                duration
            );
            log(state, message, LogColor::Yellow);
        }
        GameEventKind::CharacterChangedHp { character_id, hp } => {
            if let Some(c) = state.characters.get_mut(&character_id) {
                c.hp.current = c.hp.current.saturating_add(hp);
            }
            let name = state.name_of(&character_id);
            if hp > 0 {
                log(state, format!("{name} was healed by {hp} hp"), LogColor::Green);
            } else {
                log(
                    state,
                    format!("{name} lost {} hp", hp.unsigned_abs()),
                    LogColor::White,
                );
            }
        }
        GameEventKind::CharacterSwitchWeapon {
            character_id,
            weapon,
        } => {
            if let Some(c) = state.characters.get_mut(&character_id) {
                c.active_weapon = Some(weapon.clone());
            }
            let message = format!(
                "{} switched weapon to {}",
                state.name_of(&character_id),
                weapon
            );
            log(state, message, LogColor::Yellow);
        }
        GameEventKind::Unknown => {}
    }
}

fn upsert(state: &mut GameState, data: CharacterData) {
    let character = Character::from_wire(data, &state.viewport);
    state.characters.insert(character.id.clone(), character);
}

fn relocate(state: &mut GameState, id: &str, to: Position) {
    let viewport = state.viewport;
    match state.characters.get_mut(id) {
        Some(c) => {
            c.anchor = to;
            c.position = viewport.token_origin(to);
        }
        None => tracing::debug!(character_id = %id, "Position update for unknown character"),
    }
}

fn display_name(data: &CharacterData) -> &str {
    if data.name.is_empty() {
        &data.id
    } else {
        &data.name
    }
}
