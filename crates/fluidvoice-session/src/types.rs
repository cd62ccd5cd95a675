use fluidvoice_audio::Recording;
use fluidvoice_foundation::error::FluidVoiceError;
use fluidvoice_inject::AppTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Arming,
    Recording,
    Stopping,
    Transcribing,
    Injecting,
    Error,
}

/// Inputs to the state machine. Every external actor — hotkey listener,
/// capture engine, dispatcher, injector — talks to the session only by
/// sending one of these onto the single event channel.
#[derive(Debug)]
pub enum SessionEvent {
    HotkeyStart,
    HotkeyStop,
    HotkeyToggle,
    Cancel,
    CaptureFinished(Recording, AppTarget),
    TranscriptionFinished(Result<String, FluidVoiceError>),
    InjectionAcked(Result<(), FluidVoiceError>),
    /// The device backing the in-progress recording disconnected (§7
    /// `device_lost`). The partial recording is still finalized and sent
    /// on for transcription; the app is expected to pre-warm a
    /// replacement device in response to `SessionEffect::PrewarmNextDevice`.
    DeviceLost,
    Timeout,
    ReloadConfig,
}

/// Outputs of the state machine. Long-running or third-party-dependent
/// work — transcription, injection — is never performed by the
/// controller itself; it publishes what needs doing here and waits for
/// the corresponding `SessionEvent` to report the outcome.
#[derive(Debug)]
pub enum SessionEffect {
    Transcribe(Recording),
    Inject { text: String, target: AppTarget },
    /// Raised after a `device_lost` finalize; the app should select and
    /// pre-warm the next available device so the following recording
    /// starts with no open-device latency.
    PrewarmNextDevice,
}
