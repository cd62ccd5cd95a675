//! Translates raw chord down/up edges from a `HotkeyBackend` into
//! `HotkeyEvent`s, applying debounce, coalescing and tap-vs-hold
//! classification. This is deliberately hand-rolled rather than built on a
//! generic `{modifiers, keycode}` hotkey crate, since push-to-talk tap/hold
//! classification and bare-modifier chords both need edge timing the
//! common hotkey-library APIs don't expose.

use crate::types::{HotkeyEvent, InputMode, RawEdge, COALESCE_GAP};
use fluidvoice_foundation::clock::Clock;
use std::sync::Arc;
use std::time::Instant;

pub struct ChordStateMachine {
    clock: Arc<dyn Clock>,
    mode: InputMode,
    down_since: Option<Instant>,
    last_edge_at: Option<Instant>,
    toggled_on: bool,
}

impl ChordStateMachine {
    pub fn new(clock: Arc<dyn Clock>, mode: InputMode) -> Self {
        Self {
            clock,
            mode,
            down_since: None,
            last_edge_at: None,
            toggled_on: false,
        }
    }

    /// Feeds one raw edge; returns the `HotkeyEvent` it produces, if any.
    pub fn on_edge(&mut self, edge: RawEdge) -> Option<HotkeyEvent> {
        let now = self.clock.now();

        if let Some(last) = self.last_edge_at {
            if now.duration_since(last) < COALESCE_GAP {
                self.last_edge_at = Some(now);
                return None;
            }
        }
        self.last_edge_at = Some(now);

        match (edge, self.mode) {
            (RawEdge::Down, InputMode::Toggle) => {
                self.toggled_on = !self.toggled_on;
                Some(if self.toggled_on {
                    HotkeyEvent::Start
                } else {
                    HotkeyEvent::Stop
                })
            }
            (RawEdge::Up, InputMode::Toggle) => None,
            (RawEdge::Down, InputMode::PushToTalk { .. }) => {
                self.down_since = Some(now);
                None
            }
            (RawEdge::Up, InputMode::PushToTalk { hold_threshold }) => {
                let Some(started) = self.down_since.take() else {
                    // Phantom key-up with no preceding key-down (e.g. after
                    // a focus change): ignore it.
                    return None;
                };
                let held = now.duration_since(started);
                if held >= hold_threshold {
                    Some(HotkeyEvent::Stop)
                } else {
                    // A short tap behaves like a toggle: start recording,
                    // the next tap or the explicit Cancel stops it.
                    self.toggled_on = !self.toggled_on;
                    Some(if self.toggled_on {
                        HotkeyEvent::Start
                    } else {
                        HotkeyEvent::Stop
                    })
                }
            }
        }
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
        self.down_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidvoice_foundation::clock::TestClock;
    use std::time::Duration;

    #[test]
    fn toggle_mode_alternates_start_stop() {
        let clock = Arc::new(TestClock::new());
        let mut sm = ChordStateMachine::new(clock.clone(), InputMode::Toggle);
        assert_eq!(sm.on_edge(RawEdge::Down), Some(HotkeyEvent::Start));
        clock.advance(Duration::from_millis(100));
        assert_eq!(sm.on_edge(RawEdge::Down), Some(HotkeyEvent::Stop));
    }

    #[test]
    fn coalesces_rapid_edges_within_gap() {
        let clock = Arc::new(TestClock::new());
        let mut sm = ChordStateMachine::new(clock.clone(), InputMode::Toggle);
        assert_eq!(sm.on_edge(RawEdge::Down), Some(HotkeyEvent::Start));
        clock.advance(Duration::from_millis(10));
        assert_eq!(sm.on_edge(RawEdge::Down), None);
    }

    #[test]
    fn push_to_talk_hold_stops_on_release() {
        let clock = Arc::new(TestClock::new());
        let mut sm = ChordStateMachine::new(
            clock.clone(),
            InputMode::PushToTalk {
                hold_threshold: Duration::from_millis(200),
            },
        );
        assert_eq!(sm.on_edge(RawEdge::Down), None);
        clock.advance(Duration::from_millis(300));
        assert_eq!(sm.on_edge(RawEdge::Up), Some(HotkeyEvent::Stop));
    }

    #[test]
    fn push_to_talk_tap_toggles() {
        let clock = Arc::new(TestClock::new());
        let mut sm = ChordStateMachine::new(
            clock.clone(),
            InputMode::PushToTalk {
                hold_threshold: Duration::from_millis(200),
            },
        );
        assert_eq!(sm.on_edge(RawEdge::Down), None);
        clock.advance(Duration::from_millis(60));
        assert_eq!(sm.on_edge(RawEdge::Up), Some(HotkeyEvent::Start));
    }

    #[test]
    fn phantom_key_up_is_ignored() {
        let clock = Arc::new(TestClock::new());
        let mut sm = ChordStateMachine::new(
            clock.clone(),
            InputMode::PushToTalk {
                hold_threshold: Duration::from_millis(200),
            },
        );
        assert_eq!(sm.on_edge(RawEdge::Up), None);
    }
}
