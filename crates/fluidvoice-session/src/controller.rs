//! Single-writer session state machine, generalized from the validated
//! transition-table shape of the foundation's state manager into a full
//! actor: one task owns the state, reads events off one channel, and
//! publishes every observable transition on a watch channel instead of a
//! broadcast of raw state values.
//!
//! Transcription and injection are long-running and depend on crates this
//! one does not pull in, so the controller never performs them itself: it
//! publishes a `SessionEffect` describing the work and waits for the
//! corresponding `SessionEvent` to report back what happened. This keeps
//! the controller a pure, testable transition table.

use crate::types::{SessionEffect, SessionEvent, SessionState};
use fluidvoice_audio::CaptureSource;
use fluidvoice_foundation::clock::SharedClock;
use fluidvoice_inject::{AppTarget, TargetLocator};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

const STOPPING_DEADLINE: Duration = Duration::from_secs(2);
const TRANSCRIBING_DEADLINE: Duration = Duration::from_secs(30);
const INJECTING_DEADLINE: Duration = Duration::from_secs(2);
const ERROR_COOLDOWN: Duration = Duration::from_millis(500);
const AUDIO_LEVEL_POLL_INTERVAL: Duration = Duration::from_millis(16);

fn deadline_for(state: SessionState) -> Option<Duration> {
    match state {
        SessionState::Stopping => Some(STOPPING_DEADLINE),
        SessionState::Transcribing => Some(TRANSCRIBING_DEADLINE),
        SessionState::Injecting => Some(INJECTING_DEADLINE),
        SessionState::Error => Some(ERROR_COOLDOWN),
        _ => None,
    }
}

enum Wake {
    Event(Option<SessionEvent>),
    Tick,
    TimedOut,
}

pub struct SessionHandle {
    pub events: mpsc::Sender<SessionEvent>,
    pub effects: mpsc::Receiver<SessionEffect>,
    pub state: watch::Receiver<SessionState>,
    pub audio_level: watch::Receiver<f32>,
    task: tokio::task::JoinHandle<()>,
}

impl SessionHandle {
    pub fn abort(&self) {
        self.task.abort();
    }
}

pub struct SessionController {
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    audio_level_tx: watch::Sender<f32>,
    effects_tx: mpsc::Sender<SessionEffect>,
    events_tx: mpsc::Sender<SessionEvent>,
    clock: SharedClock,
    entered_at: Instant,
    pending_target: Option<AppTarget>,
    capture: Arc<dyn CaptureSource>,
    target_locator: Arc<dyn TargetLocator>,
}

impl SessionController {
    /// Spawns the actor and returns a handle carrying the event sender,
    /// the effect receiver, and the observable watch channels. No other
    /// task is ever given a reference to the controller itself.
    pub fn spawn(
        capture: Arc<dyn CaptureSource>,
        target_locator: Arc<dyn TargetLocator>,
        clock: SharedClock,
    ) -> SessionHandle {
        let (events_tx, events_rx) = mpsc::channel(32);
        let (effects_tx, effects_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let (audio_level_tx, audio_level_rx) = watch::channel(0.0);

        let controller = SessionController {
            state: SessionState::Idle,
            state_tx,
            audio_level_tx,
            effects_tx,
            events_tx: events_tx.clone(),
            clock: clock.clone(),
            entered_at: clock.now(),
            pending_target: None,
            capture,
            target_locator,
        };

        let task = tokio::spawn(controller.run(events_rx));

        SessionHandle {
            events: events_tx,
            effects: effects_rx,
            state: state_rx,
            audio_level: audio_level_rx,
            task,
        }
    }

    fn transition(&mut self, to: SessionState) {
        info!(from = ?self.state, to = ?to, "session state transition");
        self.state = to;
        self.entered_at = self.clock.now();
        let _ = self.state_tx.send(to);
    }

    async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        let mut level_ticker = tokio::time::interval(AUDIO_LEVEL_POLL_INTERVAL);
        loop {
            // `Clock::now()` drives the elapsed-time math so deadline
            // bookkeeping is consistent with the rest of the ambient
            // stack; the actual suspend point is the runtime's own timer
            // since `Clock::sleep` is a synchronous primitive meant for
            // the debounce logic in `fluidvoice-hotkey`, not for async
            // waits here.
            let deadline = deadline_for(self.state);
            let remaining = deadline.map(|d| {
                d.saturating_sub(self.clock.now().saturating_duration_since(self.entered_at))
            });

            let wake = match remaining {
                Some(remaining) => tokio::select! {
                    ev = events.recv() => Wake::Event(ev),
                    _ = level_ticker.tick() => Wake::Tick,
                    _ = tokio::time::sleep(remaining) => Wake::TimedOut,
                },
                None => tokio::select! {
                    ev = events.recv() => Wake::Event(ev),
                    _ = level_ticker.tick() => Wake::Tick,
                },
            };

            match wake {
                Wake::Event(Some(event)) => self.handle_event(event).await,
                Wake::Event(None) => break,
                Wake::Tick => self.publish_audio_level(),
                Wake::TimedOut => self.handle_event(SessionEvent::Timeout).await,
            }
        }
    }

    fn publish_audio_level(&self) {
        if self.state == SessionState::Recording {
            let _ = self.audio_level_tx.send(self.capture.current_level());
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        use SessionEvent::*;
        use SessionState::*;

        match (self.state, event) {
            (Idle, HotkeyStart) | (Idle, HotkeyToggle) => self.begin_recording(),
            (Recording, HotkeyStop) | (Recording, HotkeyToggle) => self.begin_stopping().await,
            (Recording, Cancel) => {
                self.capture.stop_recording();
                self.pending_target = None;
                self.transition(Idle);
            }
            (Recording, DeviceLost) => {
                warn!("recording device disconnected, finalizing partial recording");
                self.begin_stopping().await;
                let _ = self.effects_tx.send(SessionEffect::PrewarmNextDevice).await;
            }
            (Stopping, CaptureFinished(recording, target)) => {
                self.pending_target = Some(target);
                self.transition(Transcribing);
                let _ = self.effects_tx.send(SessionEffect::Transcribe(recording)).await;
            }
            (Transcribing, TranscriptionFinished(Ok(corrected_text))) => {
                if corrected_text.is_empty() {
                    // §8: empty PCM corrects to empty text; the injector is
                    // never invoked for it.
                    self.pending_target = None;
                    self.transition(Idle);
                    return;
                }
                self.transition(Injecting);
                if let Some(target) = self.pending_target.clone() {
                    let _ = self
                        .effects_tx
                        .send(SessionEffect::Inject {
                            text: corrected_text,
                            target,
                        })
                        .await;
                } else {
                    warn!("no target app recorded for injection");
                    self.enter_error();
                }
            }
            (Transcribing, TranscriptionFinished(Err(e))) => {
                warn!(error = %e, "transcription failed");
                self.enter_error();
            }
            (Transcribing, Cancel) => {
                self.pending_target = None;
                self.transition(Idle);
            }
            (Injecting, InjectionAcked(Ok(()))) => {
                self.pending_target = None;
                self.transition(Idle);
            }
            (Injecting, InjectionAcked(Err(e))) => {
                warn!(error = %e, "injection failed");
                self.enter_error();
            }
            (Error, Timeout) => {
                self.transition(Idle);
            }
            (_, Timeout) => {
                warn!(state = ?self.state, "state deadline exceeded");
                self.enter_error();
            }
            (Error, _) => {
                // Ignore other events while cooling down; only the deadline
                // timeout above returns the machine to Idle.
            }
            (state, event) => {
                warn!(?state, ?event, "ignored event in current state");
            }
        }
    }

    fn begin_recording(&mut self) {
        self.transition(SessionState::Arming);
        let target = self.target_locator.current_target().unwrap_or_else(|| {
            warn!("no frontmost app detected, recording without a known injection target");
            AppTarget {
                pid: 0,
                process_name: "unknown".to_string(),
                activation_verified_at: None,
            }
        });
        match self.capture.start_recording() {
            Ok(()) => {
                self.pending_target = Some(target);
                self.transition(SessionState::Recording);
            }
            Err(e) => {
                warn!(error = %e, "failed to start capture");
                self.enter_error();
            }
        }
    }

    async fn begin_stopping(&mut self) {
        self.transition(SessionState::Stopping);
        let recording = self.capture.stop_recording();
        let target = self.pending_target.clone().unwrap_or_else(|| AppTarget {
            pid: 0,
            process_name: "unknown".to_string(),
            activation_verified_at: None,
        });
        let _ = self
            .events_tx
            .send(SessionEvent::CaptureFinished(recording, target))
            .await;
    }

    fn enter_error(&mut self) {
        self.pending_target = None;
        self.transition(SessionState::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidvoice_audio::CaptureEngine;
    use fluidvoice_foundation::clock::real_clock;
    use fluidvoice_foundation::format::AudioConfig;

    struct NoTarget;
    impl TargetLocator for NoTarget {
        fn current_target(&self) -> Option<AppTarget> {
            None
        }
    }

    #[tokio::test]
    async fn start_without_a_prewarmed_device_enters_error() {
        let capture = Arc::new(CaptureEngine::new(AudioConfig::default()));
        let mut handle =
            SessionController::spawn(capture, Arc::new(NoTarget), real_clock());

        assert_eq!(*handle.state.borrow(), SessionState::Idle);
        handle.events.send(SessionEvent::HotkeyStart).await.unwrap();

        handle.state.changed().await.unwrap();
        while *handle.state.borrow() == SessionState::Arming {
            handle.state.changed().await.unwrap();
        }
        assert_eq!(*handle.state.borrow(), SessionState::Error);
        handle.abort();
    }

    #[tokio::test]
    async fn unknown_event_in_idle_is_ignored() {
        let capture = Arc::new(CaptureEngine::new(AudioConfig::default()));
        let handle = SessionController::spawn(capture, Arc::new(NoTarget), real_clock());

        handle.events.send(SessionEvent::InjectionAcked(Ok(()))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*handle.state.borrow(), SessionState::Idle);
        handle.abort();
    }

    #[derive(Debug, Clone, Copy)]
    enum SimpleEvent {
        Start,
        Stop,
        Toggle,
        Cancel,
    }

    fn simple_event_strategy() -> impl proptest::strategy::Strategy<Value = SimpleEvent> {
        proptest::prop_oneof![
            proptest::strategy::Just(SimpleEvent::Start),
            proptest::strategy::Just(SimpleEvent::Stop),
            proptest::strategy::Just(SimpleEvent::Toggle),
            proptest::strategy::Just(SimpleEvent::Cancel),
        ]
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_event_sequences_never_panic_the_actor(events in proptest::collection::vec(simple_event_strategy(), 0..20)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let capture = Arc::new(CaptureEngine::new(AudioConfig::default()));
                let mut handle = SessionController::spawn(capture, Arc::new(NoTarget), real_clock());

                for event in events {
                    let sent = match event {
                        SimpleEvent::Start => handle.events.send(SessionEvent::HotkeyStart).await,
                        SimpleEvent::Stop => handle.events.send(SessionEvent::HotkeyStop).await,
                        SimpleEvent::Toggle => handle.events.send(SessionEvent::HotkeyToggle).await,
                        SimpleEvent::Cancel => handle.events.send(SessionEvent::Cancel).await,
                    };
                    if sent.is_err() {
                        break;
                    }
                    // Drain any effect the actor published so its mpsc queue
                    // never fills up and stalls the feed.
                    while handle.effects.try_recv().is_ok() {}
                }

                tokio::time::sleep(Duration::from_millis(10)).await;
                // A live actor always holds a valid, observable state; the
                // real assertion is that the block above never panicked and
                // the watch channel is still being driven by the task.
                let _ = *handle.state.borrow();
                handle.abort();
            });
        }
    }
}
