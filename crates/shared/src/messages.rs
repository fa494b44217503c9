//! WebSocket message types for server-player communication
//!
//! Every frame in either direction is an [`Envelope`]: an event name, an
//! optional correlation token, and a JSON payload. Requests reuse their
//! action name as the event name; responses come back under the same name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::character::{CharacterData, Position};
use crate::wire;

/// Names of push events the server emits without a matching request.
pub mod events {
    pub const CHARACTER_JOIN: &str = "characterJoin";
    pub const CHARACTER_UPDATE: &str = "characterUpdate";
    pub const GAME_STATUS: &str = "gameStatus";
    pub const GAME_EVENT: &str = "gameEvent";
    /// Also the action name of the spawn request; the server broadcasts the
    /// new NPCs to everyone else under the same name.
    pub const CREATE_NPCS: &str = "createNPCs";
    pub const RESET: &str = "reset";
}

// =============================================================================
// Envelope
// =============================================================================

/// One frame on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            request_id: None,
            data,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// =============================================================================
// Client Requests (Player → Server)
// =============================================================================

/// Turn actions that only carry the currently selected target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetedAction {
    Attack,
    Spell,
    Pass,
    Start,
    Continue,
    Reset,
    Kill,
    Stun,
}

impl TargetedAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetedAction::Attack => "attack",
            TargetedAction::Spell => "spell",
            TargetedAction::Pass => "pass",
            TargetedAction::Start => "start",
            TargetedAction::Continue => "continue",
            TargetedAction::Reset => "reset",
            TargetedAction::Kill => "kill",
            TargetedAction::Stun => "stun",
        }
    }

    /// Actions only the DM may issue.
    pub fn is_privileged(self) -> bool {
        matches!(
            self,
            TargetedAction::Start
                | TargetedAction::Continue
                | TargetedAction::Reset
                | TargetedAction::Kill
                | TargetedAction::Stun
        )
    }
}

/// Bulk stat edit for one character (`changeSelChar`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub character: Option<String>,
    pub curr_hp: i32,
    pub max_hp: i32,
    pub dice: i32,
    pub damage: i32,
    pub modifier: i32,
    pub armor: i32,
}

/// Requests the player can send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// Fetch role, chosen character and display name for this session
    Info,
    /// List the characters still available for selection
    SelectableCharacters,
    /// Claim a character, optionally presenting the DM credential
    ChooseCharacter {
        name: String,
        password: Option<String>,
    },
    /// Fetch the full character roster
    Roster,
    /// Move the player's own character (authoritative coordinates)
    Move { pos: Position },
    /// DM places any character (authoritative coordinates)
    Place { target: String, pos: Position },
    Targeted {
        action: TargetedAction,
        target: Option<String>,
    },
    Dash,
    ChangeHealth {
        target: Option<String>,
        life: i32,
    },
    CreateNpcs { amount: u32, allies: bool },
    EditCharacter(CharacterStats),
    SwitchWeapon { name: String },
    Login { password: String },
}

impl ClientRequest {
    /// Wire action name; responses arrive under the same name.
    pub fn action(&self) -> &'static str {
        match self {
            ClientRequest::Info => "info",
            ClientRequest::SelectableCharacters => "getSelectableCharacters",
            ClientRequest::ChooseCharacter { .. } => "chooseCharacter",
            ClientRequest::Roster => "getCharacters",
            ClientRequest::Move { .. } => "move",
            ClientRequest::Place { .. } => "place",
            ClientRequest::Targeted { action, .. } => action.as_str(),
            ClientRequest::Dash => "dash",
            ClientRequest::ChangeHealth { .. } => "changeHealth",
            ClientRequest::CreateNpcs { .. } => events::CREATE_NPCS,
            ClientRequest::EditCharacter(_) => "changeSelChar",
            ClientRequest::SwitchWeapon { .. } => "switchWeapon",
            ClientRequest::Login { .. } => "login",
        }
    }

    /// Request parameters as sent in the envelope payload.
    pub fn params(&self) -> Value {
        match self {
            ClientRequest::Info
            | ClientRequest::SelectableCharacters
            | ClientRequest::Roster
            | ClientRequest::Dash => json!({}),
            ClientRequest::ChooseCharacter { name, password } => match password {
                Some(password) => json!({ "name": name, "password": password }),
                None => json!({ "name": name }),
            },
            ClientRequest::Move { pos } => json!({ "pos": pos.to_pair() }),
            ClientRequest::Place { target, pos } => {
                json!({ "target": target, "pos": pos.to_pair() })
            }
            ClientRequest::Targeted { target, .. } => json!({ "target": target }),
            ClientRequest::ChangeHealth { target, life } => {
                json!({ "target": target, "life": life })
            }
            ClientRequest::CreateNpcs { amount, allies } => {
                json!({ "amount": amount, "allies": allies })
            }
            ClientRequest::EditCharacter(stats) => {
                serde_json::to_value(stats).unwrap_or_else(|_| json!({}))
            }
            ClientRequest::SwitchWeapon { name } => json!({ "name": name }),
            ClientRequest::Login { password } => json!({ "password": password }),
        }
    }
}

// =============================================================================
// Server Push Payloads (Server → Player)
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Ongoing,
    Ended,
}

/// Payload of the `gameStatus` push event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatusData {
    #[serde(
        default,
        alias = "active_char",
        alias = "activeCharacterId",
        deserialize_with = "wire::opt_id"
    )]
    pub active_char: Option<String>,
    #[serde(default)]
    pub round: u32,
    #[serde(default, alias = "state")]
    pub phase: GamePhase,
}

/// Payload of the `gameEvent` push event: a timestamp plus the tagged body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameEvent {
    #[serde(default, deserialize_with = "wire::timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub kind: GameEventKind,
}

/// Bodies of `gameEvent`, selected by the inner `type` field.
///
/// Positions are authoritative. Tags this client does not know decode to
/// [`GameEventKind::Unknown`] instead of failing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEventKind {
    CharacterJoin {
        character: CharacterData,
    },
    CharacterMove {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
        to: Position,
    },
    CharacterPlace {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
        to: Position,
    },
    SetAllCharacters {
        characters: Vec<CharacterData>,
    },
    CharactersSpawned {
        characters: Vec<CharacterData>,
    },
    CharacterDied {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
        #[serde(default)]
        reason: String,
    },
    CharacterAttack {
        #[serde(deserialize_with = "wire::id")]
        attacker: String,
        #[serde(deserialize_with = "wire::id")]
        victim: String,
        #[serde(default)]
        hit: String,
        damage: i32,
    },
    CharacterSurvived {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
        hp: i32,
        #[serde(default)]
        reason: String,
    },
    #[serde(rename = "characterKO")]
    CharacterKo {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
    },
    CharacterDeathRoll {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
        roll: i32,
    },
    CharacterStunned {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
        #[serde(default)]
        duration: u32,
    },
    CharacterChangedHp {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
        hp: i32,
    },
    CharacterSwitchWeapon {
        #[serde(alias = "character_id", deserialize_with = "wire::id")]
        character_id: String,
        weapon: String,
    },
    #[serde(other)]
    Unknown,
}

impl GameEvent {
    /// The raw `type` tag of a `gameEvent` payload, for diagnostics.
    pub fn tag_of(payload: &Value) -> &str {
        payload
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targeted_request_carries_selected_target() {
        let req = ClientRequest::Targeted {
            action: TargetedAction::Attack,
            target: Some("c2".into()),
        };
        assert_eq!(req.action(), "attack");
        assert_eq!(req.params(), json!({"target": "c2"}));

        let none = ClientRequest::Targeted {
            action: TargetedAction::Pass,
            target: None,
        };
        assert_eq!(none.params(), json!({"target": null}));
    }

    #[test]
    fn move_and_place_send_coordinate_pairs() {
        let mv = ClientRequest::Move {
            pos: Position::new(10, 20),
        };
        assert_eq!(mv.action(), "move");
        assert_eq!(mv.params(), json!({"pos": [10, 20]}));

        let place = ClientRequest::Place {
            target: "npc-1".into(),
            pos: Position::new(3, 4),
        };
        assert_eq!(place.action(), "place");
        assert_eq!(place.params(), json!({"target": "npc-1", "pos": [3, 4]}));
    }

    #[test]
    fn choose_character_omits_missing_password() {
        let req = ClientRequest::ChooseCharacter {
            name: "Thork".into(),
            password: None,
        };
        assert_eq!(req.params(), json!({"name": "Thork"}));
    }

    #[test]
    fn envelope_skips_absent_request_id() {
        let frame = Envelope::new("dash", json!({}));
        let text = serde_json::to_string(&frame).expect("serialize");
        assert_eq!(text, r#"{"event":"dash","data":{}}"#);

        let tagged = frame.with_request_id("abc");
        let text = serde_json::to_string(&tagged).expect("serialize");
        assert!(text.contains(r#""requestId":"abc""#));
    }

    #[test]
    fn game_event_decodes_attack_with_timestamp() {
        let ev: GameEvent = serde_json::from_value(json!({
            "type": "characterAttack",
            "timestamp": 1700000000,
            "attacker": "c1",
            "victim": 2,
            "hit": "longsword",
            "damage": 4
        }))
        .expect("attack");
        assert!(ev.timestamp.is_some());
        assert_eq!(
            ev.kind,
            GameEventKind::CharacterAttack {
                attacker: "c1".into(),
                victim: "2".into(),
                hit: "longsword".into(),
                damage: 4,
            }
        );
    }

    #[test]
    fn game_event_decodes_ko_tag() {
        let ev: GameEvent =
            serde_json::from_value(json!({"type": "characterKO", "characterId": "c1"}))
                .expect("ko");
        assert_eq!(
            ev.kind,
            GameEventKind::CharacterKo {
                character_id: "c1".into()
            }
        );
    }

    #[test]
    fn unknown_game_event_tag_is_not_an_error() {
        let ev: GameEvent =
            serde_json::from_value(json!({"type": "weatherChanged", "rain": true}))
                .expect("unknown tag");
        assert_eq!(ev.kind, GameEventKind::Unknown);
    }

    #[test]
    fn game_status_accepts_legacy_field_names() {
        let status: GameStatusData = serde_json::from_value(json!({
            "active_char": 3,
            "round": 2,
            "state": "ended"
        }))
        .expect("status");
        assert_eq!(status.active_char.as_deref(), Some("3"));
        assert_eq!(status.round, 2);
        assert_eq!(status.phase, GamePhase::Ended);
    }
}
