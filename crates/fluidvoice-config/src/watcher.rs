//! Debounced file watcher, generalized from the device monitor's
//! poll-and-diff-with-debounce shape: editors commonly rewrite a config
//! file via temp-file-plus-rename, which fires several raw filesystem
//! events for one logical save, so changes are coalesced before the
//! callback list is invoked.

use fluidvoice_foundation::error::ConfigError;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEBOUNCE: Duration = Duration::from_millis(250);

pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    callbacks: Arc<Mutex<Vec<Box<dyn Fn(&Path) + Send + Sync>>>>,
}

impl ConfigWatcher {
    pub fn watch(path: &Path) -> Result<Self, ConfigError> {
        let (raw_tx, raw_rx) = channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(raw_tx)
            .map_err(|e| ConfigError::Watch(e.to_string()))?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Watch(e.to_string()))?;

        let callbacks: Arc<Mutex<Vec<Box<dyn Fn(&Path) + Send + Sync>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let callbacks_clone = callbacks.clone();
        let watched_path: PathBuf = path.to_path_buf();

        thread::Builder::new()
            .name("config-watcher".into())
            .spawn(move || {
                let mut pending = false;
                let mut last_change = Instant::now();
                loop {
                    match raw_rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(Ok(_event)) => {
                            pending = true;
                            last_change = Instant::now();
                        }
                        Ok(Err(e)) => warn!(error = %e, "config watch error"),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    if pending && last_change.elapsed() >= DEBOUNCE {
                        pending = false;
                        debug!(path = %watched_path.display(), "config file changed, reloading");
                        for cb in callbacks_clone.lock().iter() {
                            cb(&watched_path);
                        }
                    }
                }
            })
            .expect("failed to spawn config-watcher thread");

        Ok(Self {
            _watcher: watcher,
            callbacks,
        })
    }

    pub fn on_change(&self, callback: impl Fn(&Path) + Send + Sync + 'static) {
        self.callbacks.lock().push(Box::new(callback));
    }
}
