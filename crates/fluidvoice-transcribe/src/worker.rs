//! Spawns and supervises the out-of-process transcription worker, talking
//! to it over a Unix domain socket framed with `JsonLengthCodec`.
//!
//! `kill_on_drop(true)` plus a strict `tokio::time::timeout` around every
//! roundtrip mirrors the subprocess discipline the text-injection
//! subsystem uses for short-lived clipboard helper processes, generalized
//! here to a long-lived worker connection instead of a one-shot command.

use crate::protocol::{WorkerOp, WorkerResponse};
use fluidvoice_foundation::error::DispatchError;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio_util::codec::Framed;

use futures_util::{SinkExt, StreamExt};

pub struct WorkerHandle {
    child: Option<Child>,
    socket_path: PathBuf,
    worker_bin: PathBuf,
    conn: Option<Framed<UnixStream, crate::codec::JsonLengthCodec<WorkerOp, WorkerResponse>>>,
    last_restart: Option<Instant>,
}

impl WorkerHandle {
    pub fn new(worker_bin: PathBuf, socket_path: PathBuf) -> Self {
        Self {
            child: None,
            socket_path,
            worker_bin,
            conn: None,
            last_restart: None,
        }
    }

    pub async fn ensure_started(&mut self) -> Result<(), DispatchError> {
        if self.child.is_some() {
            return Ok(());
        }
        let _ = std::fs::remove_file(&self.socket_path);
        let child = Command::new(&self.worker_bin)
            .arg("--socket")
            .arg(&self.socket_path)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DispatchError::WorkerUnavailable(e.to_string()))?;
        self.child = Some(child);
        self.last_restart = Some(Instant::now());

        // Give the worker a bounded window to create the socket.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if UnixStream::connect(&self.socket_path).await.is_ok() {
                break;
            }
            if Instant::now() >= deadline {
                return Err(DispatchError::WorkerUnavailable(
                    "worker did not open its socket in time".into(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        Ok(())
    }

    async fn connection(
        &mut self,
    ) -> Result<&mut Framed<UnixStream, crate::codec::JsonLengthCodec<WorkerOp, WorkerResponse>>, DispatchError>
    {
        if self.conn.is_none() {
            let stream = UnixStream::connect(&self.socket_path)
                .await
                .map_err(|e| DispatchError::WorkerUnavailable(e.to_string()))?;
            self.conn = Some(Framed::new(stream, crate::codec::JsonLengthCodec::default()));
        }
        Ok(self.conn.as_mut().unwrap())
    }

    pub async fn request(
        &mut self,
        op: WorkerOp,
        timeout: Duration,
    ) -> Result<WorkerResponse, DispatchError> {
        self.ensure_started().await?;
        let conn = self.connection().await?;

        let roundtrip = async {
            conn.send(op).await.map_err(DispatchError::Io)?;
            conn.next()
                .await
                .ok_or_else(|| DispatchError::Protocol("worker closed connection".into()))?
                .map_err(DispatchError::Io)
        };

        match tokio::time::timeout(timeout, roundtrip).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                // The socket closed or a frame failed mid-roundtrip: the
                // connection is dead even though the process may still be
                // running. Drop it so the next request reconnects instead
                // of reusing a half-broken stream.
                self.conn = None;
                Err(e)
            }
            Err(_) => {
                self.conn = None;
                Err(DispatchError::WorkerTimeout(timeout))
            }
        }
    }

    /// Restarts the worker once within a 60s window; a second crash inside
    /// that window is surfaced as unavailable rather than retried forever.
    pub fn note_crash(&mut self) -> Result<(), DispatchError> {
        self.child = None;
        self.conn = None;
        let now = Instant::now();
        if let Some(last) = self.last_restart {
            if now.duration_since(last) < Duration::from_secs(60) {
                return Err(DispatchError::WorkerUnavailable(
                    "worker crashed twice within 60s".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> WorkerHandle {
        WorkerHandle::new(PathBuf::from("/bin/true"), PathBuf::from("/tmp/fluidvoice-test.sock"))
    }

    #[test]
    fn first_crash_with_no_prior_restart_is_allowed() {
        let mut h = handle();
        assert!(h.note_crash().is_ok());
    }

    #[test]
    fn crash_within_60s_of_the_last_restart_is_surfaced_as_unavailable() {
        let mut h = handle();
        h.last_restart = Some(Instant::now());
        assert!(matches!(
            h.note_crash(),
            Err(DispatchError::WorkerUnavailable(_))
        ));
    }

    #[test]
    fn crash_outside_the_60s_window_is_allowed_to_restart_again() {
        let mut h = handle();
        h.last_restart = Some(Instant::now() - Duration::from_secs(61));
        assert!(h.note_crash().is_ok());
    }

    #[test]
    fn note_crash_clears_the_child_and_connection() {
        let mut h = handle();
        h.last_restart = Some(Instant::now() - Duration::from_secs(61));
        let _ = h.note_crash();
        assert!(h.child.is_none());
        assert!(h.conn.is_none());
    }
}
