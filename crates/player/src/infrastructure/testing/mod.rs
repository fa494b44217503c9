//! Test doubles for the transport.
//!
//! Compiled unconditionally so integration tests and downstream crates can
//! drive a full session in memory.

mod loopback;

pub use loopback::{LoopbackConnector, LoopbackServer};
