pub mod controller;
pub mod types;

pub use controller::{SessionController, SessionHandle};
pub use types::{SessionEffect, SessionEvent, SessionState};
