//! WebSocket transport for the battle server.
//!
//! - `client`: tokio-tungstenite connector, one task per channel
//! - `manager`: the connection manager that owns the channel, subscriptions
//!   and pending requests

mod client;
mod manager;

pub use client::{parse_server_url, WebSocketConnector};
pub use manager::ConnectionManager;
