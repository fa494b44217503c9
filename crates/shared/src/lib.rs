//! Battlemap Shared - wire types for the battle server and its players
//!
//! This crate contains every type that crosses the WebSocket boundary:
//! - The frame envelope (`Envelope`) used in both directions
//! - Outbound requests (`ClientRequest`) and their one-shot responses (`ResponseResult`)
//! - Inbound push payloads (`CharacterData`, `GameStatusData`, `GameEvent`)
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - only serde, serde_json, chrono, thiserror and tracing
//! 2. **No client logic** - pure data types and serialization
//! 3. **Authoritative coordinates** - every position in this crate is expressed in
//!    the pixel space of the reference map at its native resolution

pub mod character;
pub mod messages;
pub mod responses;
mod wire;

pub use character::{
    CharacterData, CharacterKind, LifeStatus, NpcBatch, PlayerInfo, Position, Role,
    SelectableCharacter, SessionInfo,
};
pub use messages::{
    events, CharacterStats, ClientRequest, Envelope, GameEvent, GameEventKind, GamePhase,
    GameStatusData, TargetedAction,
};
pub use responses::{RequestError, ResponseResult};
