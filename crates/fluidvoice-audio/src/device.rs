//! Device enumeration and transport classification.
//!
//! cpal exposes no transport property on Linux/ALSA, so transport is
//! inferred from the device name the same way the upstream device manager
//! infers preferred hardware from name substrings.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use fluidvoice_foundation::error::AudioError;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Builtin,
    Usb,
    Thunderbolt,
    Firewire,
    Pci,
    Hdmi,
    Bluetooth,
    Virtual,
    Aggregate,
    Other,
}

impl Transport {
    fn classify(name: &str) -> Transport {
        let lname = name.to_lowercase();
        if lname.contains("bluetooth") || lname.contains("bt ") || lname.contains("a2dp") {
            Transport::Bluetooth
        } else if lname.contains("usb") {
            Transport::Usb
        } else if lname.contains("thunderbolt") {
            Transport::Thunderbolt
        } else if lname.contains("firewire") || lname.contains("1394") {
            Transport::Firewire
        } else if lname.contains("hdmi") || lname.contains("displayport") {
            Transport::Hdmi
        } else if lname.contains("pci") {
            Transport::Pci
        } else if lname == "default" || lname == "pipewire" || lname == "pulse" {
            Transport::Virtual
        } else if lname.contains("aggregate") {
            Transport::Aggregate
        } else if lname.starts_with("built-in")
            || lname.starts_with("internal")
            || lname.contains("analog")
        {
            Transport::Builtin
        } else {
            Transport::Other
        }
    }

    /// Whether a device on this transport may be chosen automatically
    /// without the operator naming it explicitly by UID.
    pub fn auto_selectable(&self) -> bool {
        !matches!(self, Transport::Bluetooth)
    }

    /// External > built-in > other precedence score; higher wins.
    fn precedence(&self) -> i32 {
        match self {
            Transport::Usb | Transport::Thunderbolt | Transport::Firewire => 3,
            Transport::Pci | Transport::Hdmi | Transport::Aggregate => 2,
            Transport::Builtin => 1,
            Transport::Virtual | Transport::Other => 0,
            Transport::Bluetooth => -1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub uid: String,
    pub name: String,
    pub transport: Transport,
    pub is_default: bool,
    pub input_channel_count: u16,
    pub native_sample_rate: u32,
}

pub struct DevicePicker {
    host: Host,
}

impl DevicePicker {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn enumerate(&self) -> Vec<AudioDevice> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok());

        let mut devices = Vec::new();
        if let Ok(inputs) = self.host.input_devices() {
            for device in inputs {
                if let Ok(name) = device.name() {
                    let is_default = default_name.as_deref() == Some(name.as_str());
                    let (input_channel_count, native_sample_rate) = device
                        .default_input_config()
                        .map(|cfg| (cfg.channels(), cfg.sample_rate().0))
                        .unwrap_or((0, 0));
                    devices.push(AudioDevice {
                        uid: name.clone(),
                        transport: Transport::classify(&name),
                        is_default,
                        input_channel_count,
                        native_sample_rate,
                        name,
                    });
                }
            }
        }
        devices
    }

    /// Selects the preferred device per spec: external > built-in > other,
    /// excluding Bluetooth unless `forced_uid` names it explicitly. If
    /// `forced_uid` names a device that is no longer present, falls back to
    /// automatic selection with a warning rather than failing outright.
    pub fn select(&self, forced_uid: Option<&str>) -> Result<Device, AudioError> {
        if let Some(uid) = forced_uid {
            match self.open_by_uid(uid) {
                Ok(device) => return Ok(device),
                Err(_) => warn!(%uid, "forced device not found, falling back to automatic selection"),
            }
        }
        self.select_automatic()
    }

    fn select_automatic(&self) -> Result<Device, AudioError> {
        let mut candidates = self.enumerate();
        candidates.retain(|d| d.transport.auto_selectable());
        candidates.sort_by(|a, b| {
            b.transport
                .precedence()
                .cmp(&a.transport.precedence())
                .then_with(|| b.input_channel_count.cmp(&a.input_channel_count))
                .then_with(|| a.name.cmp(&b.name))
        });

        let chosen = candidates
            .into_iter()
            .next()
            .ok_or(AudioError::NoDeviceAvailable)?;
        self.open_by_uid(&chosen.uid)
    }

    fn open_by_uid(&self, uid: &str) -> Result<Device, AudioError> {
        if let Ok(devices) = self.host.input_devices() {
            for device in devices {
                if matches!(device.name().as_deref(), Ok(name) if name == uid) {
                    return Ok(device);
                }
            }
        }
        Err(AudioError::DeviceNotFound(uid.to_string()))
    }
}

impl Default for DevicePicker {
    fn default() -> Self {
        Self::new()
    }
}
