use std::time::Duration;
use thiserror::Error;

/// Top-level error aggregating every subsystem's typed failures, matching
/// the kinds enumerated for `SessionController::error` in the design.
#[derive(Error, Debug)]
pub enum FluidVoiceError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Hotkey(#[from] HotkeyError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Injection(#[from] InjectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no input device available")]
    NoDeviceAvailable,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device disconnected mid-recording: {0}")]
    DeviceLost(String),

    #[error("unsupported stream format: {0}")]
    FormatNotSupported(String),

    #[error("cpal error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),
}

#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("portal backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("shortcut registration failed: {0}")]
    RegistrationFailed(String),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("worker process unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("worker timed out after {0:?}")]
    WorkerTimeout(Duration),

    #[error("queue full, request dropped")]
    QueueFull,

    #[error("request cancelled")]
    Cancelled,

    #[error("malformed worker response: {0}")]
    Protocol(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("no injection strategy available")]
    Unavailable,

    #[error("injection method failed: {0}")]
    MethodFailed(String),

    #[error("could not verify target app activation")]
    ActivationFailed,

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("watcher error: {0}")]
    Watch(String),
}

/// How a caller should react to a given error, mirroring the recovery
/// classification carried by the capture and injection subsystems.
#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Fallback,
    Restart,
    Fatal,
}

impl FluidVoiceError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            FluidVoiceError::Audio(AudioError::DeviceLost(_)) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_millis(500),
            },
            FluidVoiceError::Audio(AudioError::NoDeviceAvailable)
            | FluidVoiceError::Audio(AudioError::DeviceNotFound(_)) => RecoveryStrategy::Fallback,
            FluidVoiceError::Dispatch(DispatchError::WorkerUnavailable(_)) => {
                RecoveryStrategy::Restart
            }
            FluidVoiceError::Injection(InjectionError::MethodFailed(_)) => {
                RecoveryStrategy::Fallback
            }
            FluidVoiceError::PermissionDenied(_) => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Fatal,
        }
    }
}
