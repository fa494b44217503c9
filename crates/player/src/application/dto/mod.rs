//! Data transfer objects
//!
//! Types the presentation layer hands to the application layer.

pub mod player_action;

pub use player_action::PlayerAction;
