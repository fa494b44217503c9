pub mod message_translator;
pub mod messaging;
pub mod testing;
pub mod websocket;

// Re-export messaging types
pub use messaging::{ConnectionState, CorrelationPolicy, LinkStatus};
pub use websocket::{ConnectionManager, WebSocketConnector};
