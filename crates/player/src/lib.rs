//! Battlemap player: client-side synchronization engine for a shared
//! tactical battle map.
//!
//! - `infrastructure`: the connection manager, WebSocket transport and
//!   inbound payload translation
//! - `state`: the game-state reducer and the store that publishes snapshots
//! - `coords`: authoritative/render coordinate translation
//! - `application`: player actions and the service that sends them
//! - `session`: the work queue tying it together
//! - `console`: a line-oriented presentation for the binary

pub mod application;
pub mod config;
pub mod console;
pub mod coords;
pub mod error;
pub mod infrastructure;
pub mod ports;
pub mod session;
pub mod state;

pub use application::{PlayerAction, SessionContext};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use session::{Intent, Session, SessionHandle};
