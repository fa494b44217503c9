//! Client-side game state: snapshot types, the reducer, and the store that
//! owns the current snapshot.

pub mod game_state;
pub mod reducer;
pub mod store;

pub use game_state::{
    Character, CharacterId, GameState, HitPoints, LogColor, LogEntry, Vitality, MAX_LOG_ENTRIES,
};
pub use reducer::{reduce, StoreEvent};
pub use store::GameStore;
