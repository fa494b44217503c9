//! Application services
//!
//! Use cases the presentation layer triggers. Services borrow the connection
//! and the session context for the duration of one call.

pub mod action_service;

pub use action_service::ActionService;
