//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! so the connection manager can be driven by a real socket or an in-memory
//! loopback without knowing which.

pub mod connector_port;

pub use connector_port::{ChannelEvent, ChannelEventKind, Connector};

#[cfg(any(test, feature = "testing"))]
pub use connector_port::MockConnector;
