//! Device hotplug monitor: cpal has no native hotplug event on Linux, so
//! this polls the device list and diffs it, the same approach ColdVox's
//! device monitor uses, generalized to drive `CaptureEngine` rebinds.

use crate::device::{AudioDevice, DevicePicker};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use tokio::sync::broadcast;

pub const DEBOUNCE: Duration = Duration::from_millis(250);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Added(AudioDevice),
    Removed(String),
    CurrentDeviceDisconnected(String),
}

pub struct DeviceMonitor {
    tx: broadcast::Sender<DeviceEvent>,
}

impl DeviceMonitor {
    /// Spawns the poll-and-diff background thread. `current_uid` is checked
    /// on every tick so a disconnect of the actively recording device is
    /// reported distinctly from an unrelated device going away.
    pub fn spawn(current_uid: impl Fn() -> Option<String> + Send + 'static) -> Self {
        let (tx, _rx) = broadcast::channel(32);
        let tx_clone = tx.clone();

        thread::Builder::new()
            .name("device-monitor".into())
            .spawn(move || {
                let picker = DevicePicker::new();
                let mut known: HashSet<String> =
                    picker.enumerate().into_iter().map(|d| d.uid).collect();
                let mut pending_change = false;
                let mut last_change = std::time::Instant::now();

                loop {
                    thread::sleep(POLL_INTERVAL);
                    let current: Vec<AudioDevice> = picker.enumerate();
                    let current_uids: HashSet<String> =
                        current.iter().map(|d| d.uid.clone()).collect();

                    if current_uids != known {
                        pending_change = true;
                        last_change = std::time::Instant::now();
                    }

                    if pending_change && last_change.elapsed() >= DEBOUNCE {
                        for device in &current {
                            if !known.contains(&device.uid) {
                                let _ = tx_clone.send(DeviceEvent::Added(device.clone()));
                            }
                        }
                        for uid in known.difference(&current_uids) {
                            if current_uid().as_deref() == Some(uid.as_str()) {
                                let _ = tx_clone
                                    .send(DeviceEvent::CurrentDeviceDisconnected(uid.clone()));
                            } else {
                                let _ = tx_clone.send(DeviceEvent::Removed(uid.clone()));
                            }
                        }
                        known = current_uids;
                        pending_change = false;
                    }
                }
            })
            .expect("failed to spawn device-monitor thread");

        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.tx.subscribe()
    }
}
