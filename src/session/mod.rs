pub mod controller;
mod dispatch;
pub mod state;

pub use controller::{ControllerSnapshot, SessionController};
pub use state::{SessionState, SessionStatus};
