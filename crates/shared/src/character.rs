//! Character and session payloads.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::wire;

/// A point in authoritative map space (native pixels of the reference image).
///
/// Serialized as `{"x": .., "y": ..}`; also accepts the `[x, y]` pair form the
/// server uses for request parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The `[x, y]` form used by `move` and `place`.
    pub fn to_pair(self) -> [i32; 2] {
        [self.x, self.y]
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Object { x: f64, y: f64 },
            Pair([f64; 2]),
        }

        let (x, y) = match Repr::deserialize(deserializer)? {
            Repr::Object { x, y } => (x, y),
            Repr::Pair([x, y]) => (x, y),
        };
        Ok(Position::new(x.round() as i32, y.round() as i32))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterKind {
    #[default]
    Player,
    Npc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeStatus {
    #[default]
    Alive,
    Dead,
    Stunned,
}

/// A character as the server describes it.
///
/// Most fields are optional on the wire; a join event may carry little more
/// than an id and hit points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterData {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: CharacterKind,
    #[serde(default)]
    pub hp: i32,
    #[serde(default, alias = "max_hp")]
    pub max_hp: i32,
    #[serde(default)]
    pub pos: Position,
    #[serde(default)]
    pub status: LifeStatus,
    #[serde(default, alias = "stun_duration")]
    pub stun_duration: u32,
    #[serde(default, alias = "active_weapon")]
    pub active_weapon: Option<String>,
    #[serde(default)]
    pub weapons: BTreeSet<String>,
    #[serde(default, alias = "is_ally")]
    pub is_ally: bool,
    #[serde(default)]
    pub token: Option<String>,
}

impl CharacterData {
    /// Minimal character with full health at the map origin.
    pub fn new(id: impl Into<String>, name: impl Into<String>, hp: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: CharacterKind::Player,
            hp,
            max_hp: hp,
            pos: Position::default(),
            status: LifeStatus::Alive,
            stun_duration: 0,
            active_weapon: None,
            weapons: BTreeSet::new(),
            is_ally: false,
            token: None,
        }
    }
}

/// NPCs created in one batch, grouped by the template they were built from
/// (`{"villagers": [...], "veterans": [...]}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NpcBatch(pub BTreeMap<String, Vec<CharacterData>>);

impl NpcBatch {
    /// Flatten every group into one list.
    pub fn into_characters(self) -> Vec<CharacterData> {
        self.0.into_values().flatten().collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Player,
    Dm,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub character: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Payload of a successful `info` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub player: PlayerInfo,
}

/// One entry of the `getSelectableCharacters` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectableCharacter {
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}
