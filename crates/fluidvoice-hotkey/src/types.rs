use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Super,
}

/// A configured activation chord: either an ordinary key with modifiers, or
/// a bare-modifier chord (e.g. double-tap Fn) with no primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordConfig {
    pub modifiers: Vec<Modifier>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Toggle,
    PushToTalk { hold_threshold: Duration },
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::PushToTalk {
            hold_threshold: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyEvent {
    Start,
    Stop,
    Toggle,
    ConfigError(String),
}

/// Raw chord edges as reported by a backend, before debounce/coalesce and
/// tap-vs-hold classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEdge {
    Down,
    Up,
}

pub const COALESCE_GAP: Duration = Duration::from_millis(50);
