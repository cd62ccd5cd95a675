pub mod backend;
pub mod monitor;
pub mod state_machine;
pub mod types;

pub use backend::{HotkeyBackend, PortalBackend};
pub use monitor::HotkeyMonitor;
pub use state_machine::ChordStateMachine;
pub use types::{ChordConfig, HotkeyEvent, InputMode, Modifier, RawEdge};
