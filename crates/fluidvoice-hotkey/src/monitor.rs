use crate::backend::HotkeyBackend;
use crate::state_machine::ChordStateMachine;
use crate::types::{HotkeyEvent, InputMode};
use fluidvoice_foundation::clock::Clock;
use fluidvoice_foundation::error::HotkeyError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Wires a `HotkeyBackend` into a `ChordStateMachine` and exposes a channel
/// of classified `HotkeyEvent`s.
pub struct HotkeyMonitor {
    event_rx: mpsc::Receiver<HotkeyEvent>,
    _listener_task: tokio::task::JoinHandle<()>,
    _classify_task: tokio::task::JoinHandle<()>,
}

impl HotkeyMonitor {
    pub async fn start(
        mut backend: Box<dyn HotkeyBackend>,
        clock: Arc<dyn Clock>,
        mode: InputMode,
    ) -> Result<Self, HotkeyError> {
        backend.initialize().await?;

        let (edge_tx, mut edge_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(32);

        let error_tx = event_tx.clone();
        let listener_task = tokio::spawn(async move {
            if let Err(e) = backend.start_listening(edge_tx).await {
                let _ = error_tx.send(HotkeyEvent::ConfigError(e.to_string())).await;
            }
        });

        let mut sm = ChordStateMachine::new(clock, mode);
        let classify_task = tokio::spawn(async move {
            while let Some(edge) = edge_rx.recv().await {
                if let Some(event) = sm.on_edge(edge) {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
        });

        Ok(Self {
            event_rx,
            _listener_task: listener_task,
            _classify_task: classify_task,
        })
    }

    pub async fn recv(&mut self) -> Option<HotkeyEvent> {
        self.event_rx.recv().await
    }
}
