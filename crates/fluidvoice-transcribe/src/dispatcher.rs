//! Single-request-at-a-time dispatcher in front of a `WorkerHandle`, with
//! the ping/pong connection-pool shortcut and cooperative cancellation the
//! design calls for.

use crate::protocol::{WorkerOp, WorkerResponse};
use crate::worker::WorkerHandle;
use fluidvoice_foundation::error::DispatchError;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

const QUEUE_TIMEOUT: Duration = Duration::from_secs(2);
const PING_TIMEOUT: Duration = Duration::from_millis(500);
const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(30);
const SKIP_PING_WITHIN: Duration = Duration::from_secs(10);
const REUSE_PING_WITHIN: Duration = Duration::from_secs(5);

enum Command {
    Transcribe {
        request_id: u64,
        pcm: Vec<i16>,
        reply: oneshot::Sender<Result<String, DispatchError>>,
    },
    Cancel {
        request_id: u64,
    },
}

#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Command>,
}

impl Dispatcher {
    pub fn spawn(worker_bin: PathBuf, socket_path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(run(WorkerHandle::new(worker_bin, socket_path), rx));
        Self { tx }
    }

    pub async fn transcribe(&self, request_id: u64, pcm: Vec<i16>) -> Result<String, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        match tokio::time::timeout(
            QUEUE_TIMEOUT,
            self.tx.send(Command::Transcribe {
                request_id,
                pcm,
                reply: reply_tx,
            }),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(DispatchError::WorkerUnavailable("dispatcher stopped".into())),
            Err(_) => return Err(DispatchError::QueueFull),
        }

        reply_rx
            .await
            .unwrap_or(Err(DispatchError::Cancelled))
    }

    pub async fn cancel(&self, request_id: u64) {
        let _ = self.tx.send(Command::Cancel { request_id }).await;
    }
}

/// A ping only needs to precede a transcription when the connection has
/// been idle long enough to risk a stale/closed socket, and no other ping
/// has already probed it recently.
fn needs_ping(last_transcription: Option<Instant>, last_ping: Option<Instant>, now: Instant) -> bool {
    last_transcription
        .map(|t| now.duration_since(t) >= SKIP_PING_WITHIN)
        .unwrap_or(true)
        && last_ping
            .map(|t| now.duration_since(t) >= REUSE_PING_WITHIN)
            .unwrap_or(true)
}

/// Removes `request_id` from the cancelled set, returning whether it was
/// present. A request that arrives after the caller cancelled it is
/// discarded exactly once; a later request reusing the same id is not.
fn is_cancelled(cancelled: &mut std::collections::HashSet<u64>, request_id: u64) -> bool {
    cancelled.remove(&request_id)
}

async fn run(mut worker: WorkerHandle, mut rx: mpsc::Receiver<Command>) {
    let mut last_transcription: Option<Instant> = None;
    let mut last_ping: Option<Instant> = None;
    let mut cancelled: std::collections::HashSet<u64> = Default::default();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Cancel { request_id } => {
                cancelled.insert(request_id);
            }
            Command::Transcribe {
                request_id,
                pcm,
                reply,
            } => {
                if needs_ping(last_transcription, last_ping, Instant::now()) {
                    if let Err(e) = worker.request(WorkerOp::Ping, PING_TIMEOUT).await {
                        tracing::warn!(error = %e, "worker ping failed, will restart on next request");
                        let _ = worker.note_crash();
                    }
                    last_ping = Some(Instant::now());
                }

                let result = worker
                    .request(
                        WorkerOp::Transcribe {
                            request_id,
                            pcm16_mono_16k: pcm,
                        },
                        TRANSCRIBE_TIMEOUT,
                    )
                    .await
                    .and_then(|resp| match resp {
                        WorkerResponse::Ok { text, .. } => Ok(text),
                        WorkerResponse::Error { message, .. } => {
                            Err(DispatchError::Protocol(message))
                        }
                        WorkerResponse::Pong => {
                            Err(DispatchError::Protocol("unexpected pong".into()))
                        }
                    });

                last_transcription = Some(Instant::now());

                if is_cancelled(&mut cancelled, request_id) {
                    // Discard the result; SessionController already moved on.
                    continue;
                }
                let _ = reply.send(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pings_on_the_first_request() {
        assert!(needs_ping(None, None, Instant::now()));
    }

    #[test]
    fn skips_ping_right_after_a_transcription() {
        let now = Instant::now();
        assert!(!needs_ping(Some(now), None, now));
    }

    #[test]
    fn reuses_a_recent_ping_instead_of_sending_another() {
        let now = Instant::now();
        let transcribed_long_ago = now - SKIP_PING_WITHIN - Duration::from_secs(1);
        let pinged_recently = now - Duration::from_secs(1);
        assert!(!needs_ping(Some(transcribed_long_ago), Some(pinged_recently), now));
    }

    #[test]
    fn pings_again_once_the_reuse_window_elapses() {
        let now = Instant::now();
        let transcribed_long_ago = now - SKIP_PING_WITHIN - Duration::from_secs(1);
        let stale_ping = now - REUSE_PING_WITHIN - Duration::from_secs(1);
        assert!(needs_ping(Some(transcribed_long_ago), Some(stale_ping), now));
    }

    #[test]
    fn cancelled_request_is_discarded_exactly_once() {
        let mut cancelled = std::collections::HashSet::new();
        cancelled.insert(7);
        assert!(is_cancelled(&mut cancelled, 7));
        assert!(!is_cancelled(&mut cancelled, 7));
    }

    #[tokio::test(start_paused = true)]
    async fn transcribe_times_out_with_queue_full_when_the_worker_is_busy() {
        let (tx, rx) = mpsc::channel(1);
        let dispatcher = Dispatcher { tx };

        // Occupy the channel's one slot without ever draining it, so the
        // next send blocks until `QUEUE_TIMEOUT` elapses.
        let (reply_tx, _reply_rx) = oneshot::channel();
        dispatcher
            .tx
            .send(Command::Transcribe {
                request_id: 1,
                pcm: vec![],
                reply: reply_tx,
            })
            .await
            .unwrap();

        let result = dispatcher.transcribe(2, vec![]).await;
        assert!(matches!(result, Err(DispatchError::QueueFull)));
        drop(rx);
    }
}
