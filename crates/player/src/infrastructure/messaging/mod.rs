//! Messaging infrastructure for the battle server channel:
//! - `command_bus`: request framing and one-shot response correlation
//! - `event_bus`: persistent named-event subscriptions
//! - `connection`: link status, close reasons and the channel handle
//!
//! The connection manager (in the websocket module) ties these to a transport.

pub mod command_bus;
pub mod connection;
pub mod event_bus;

pub use command_bus::{request_frame, CorrelationPolicy, PendingRequests, ResponseCallback};
pub use connection::{
    describe_close_code, ChannelHandle, CloseReason, ConnectionState, LinkStatus,
    LinkStatusObserver,
};
pub use event_bus::{EventHandler, SubscriptionSet};
