pub mod context;
pub mod dto;
pub mod services;

pub use context::{LocalPlayer, SessionContext};
pub use dto::PlayerAction;
pub use services::ActionService;
