//! Player action DTOs (application layer)
//!
//! Local user intents as the presentation layer produces them. Positions are
//! in render space; the action service converts them before anything is sent.

use battlemap_shared::{CharacterStats, TargetedAction};

use crate::coords::{RenderPoint, Size};

/// Something the local user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    /// Choose (or clear) the character targeted by subsequent actions
    Select(Option<String>),
    /// Attack, spell, pass, kill, stun and the game-flow actions, aimed at
    /// the selected character
    Targeted(TargetedAction),
    Dash,
    /// Adjust the selected character's hit points by `life`
    ChangeHealth { life: i32 },
    CreateNpcs { amount: u32, allies: bool },
    EditCharacter(CharacterStats),
    SwitchWeapon(String),
    /// A token was dropped with its top-left corner at `origin`
    DropToken {
        character_id: String,
        origin: RenderPoint,
    },
    /// The render surface was measured or resized
    Resize(Size),
    ChooseCharacter {
        name: String,
        password: Option<String>,
    },
    Login(String),
    FetchInfo,
    FetchRoster,
    FetchSelectable,
}

impl PlayerAction {
    pub fn attack() -> Self {
        PlayerAction::Targeted(TargetedAction::Attack)
    }

    pub fn spell() -> Self {
        PlayerAction::Targeted(TargetedAction::Spell)
    }

    pub fn pass() -> Self {
        PlayerAction::Targeted(TargetedAction::Pass)
    }

    pub fn select(character_id: impl Into<String>) -> Self {
        PlayerAction::Select(Some(character_id.into()))
    }

    pub fn drop_token(character_id: impl Into<String>, x: i32, y: i32) -> Self {
        PlayerAction::DropToken {
            character_id: character_id.into(),
            origin: RenderPoint::new(x, y),
        }
    }

    /// Short label used in log lines and traces.
    pub fn label(&self) -> &'static str {
        match self {
            PlayerAction::Select(_) => "select",
            PlayerAction::Targeted(action) => action.as_str(),
            PlayerAction::Dash => "dash",
            PlayerAction::ChangeHealth { .. } => "changeHealth",
            PlayerAction::CreateNpcs { .. } => "createNPCs",
            PlayerAction::EditCharacter(_) => "changeSelChar",
            PlayerAction::SwitchWeapon(_) => "switchWeapon",
            PlayerAction::DropToken { .. } => "drop",
            PlayerAction::Resize(_) => "resize",
            PlayerAction::ChooseCharacter { .. } => "chooseCharacter",
            PlayerAction::Login(_) => "login",
            PlayerAction::FetchInfo => "info",
            PlayerAction::FetchRoster => "getCharacters",
            PlayerAction::FetchSelectable => "getSelectableCharacters",
        }
    }
}
