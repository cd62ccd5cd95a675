pub mod capture;
pub mod device;
pub mod monitor;
pub mod resampler;
pub mod ring_buffer;

pub use capture::{CaptureEngine, CaptureSource, Recording};
pub use device::{AudioDevice, DevicePicker, Transport};
pub use monitor::{DeviceEvent, DeviceMonitor};
