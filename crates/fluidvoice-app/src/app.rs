//! `FluidVoiceApp`: owns every constructed service and the glue loop that
//! ties the session state machine's effects back into dispatcher and
//! injector calls, generalized from ColdVox's `runtime.rs` `AppRuntime`
//! shape into the scoped-service-with-explicit-lifetimes form the
//! "global mutable state" redesign flag calls for — no service here is a
//! static or a singleton, every one is constructed, owned, and torn down
//! by this struct.

use cpal::traits::DeviceTrait;
use fluidvoice_audio::{CaptureEngine, DeviceEvent, DeviceMonitor, DevicePicker};
use fluidvoice_config::ConfigWatcher;
use fluidvoice_foundation::clock::{real_clock, SharedClock};
use fluidvoice_foundation::error::FluidVoiceError;
use fluidvoice_foundation::format::AudioConfig;
use fluidvoice_hotkey::{HotkeyEvent, HotkeyMonitor, InputMode, PortalBackend};
use fluidvoice_inject::{
    ClipboardSandwichInjector, NullTargetLocator, StrategyManager, SynthesizedTypingInjector,
    TargetLocator,
};
use fluidvoice_session::{SessionController, SessionEffect, SessionEvent, SessionHandle};
use fluidvoice_transcribe::Dispatcher;
use fluidvoice_vocab::{VocabConfig, VocabularyCorrector};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

pub struct AppOptions {
    pub forced_device_uid: Option<String>,
    pub enable_hotkey: bool,
    pub worker_bin: PathBuf,
    pub socket_path: PathBuf,
    pub vocabulary_path: Option<PathBuf>,
}

pub struct FluidVoiceApp {
    session: SessionHandle,
    hotkey: Option<HotkeyMonitor>,
    dispatcher: Dispatcher,
    corrector: Arc<VocabularyCorrector>,
    injector: Arc<StrategyManager>,
    _config_watcher: Option<ConfigWatcher>,
    request_id: std::sync::atomic::AtomicU64,
    capture: Arc<CaptureEngine>,
    picker: DevicePicker,
    current_device_uid: Arc<Mutex<Option<String>>>,
    _device_monitor: DeviceMonitor,
    device_events: broadcast::Receiver<DeviceEvent>,
}

impl FluidVoiceApp {
    pub async fn start(opts: AppOptions) -> Result<Self, FluidVoiceError> {
        let clock: SharedClock = real_clock();

        let picker = DevicePicker::new();
        let device = picker
            .select(opts.forced_device_uid.as_deref())
            .map_err(FluidVoiceError::Audio)?;
        let current_device_uid = Arc::new(Mutex::new(device.name().ok()));

        let capture = Arc::new(CaptureEngine::new(AudioConfig::default()));
        capture.prewarm(device).map_err(FluidVoiceError::Audio)?;

        let monitor_uid = current_device_uid.clone();
        let device_monitor = DeviceMonitor::spawn(move || monitor_uid.lock().clone());
        let device_events = device_monitor.subscribe();

        let target_locator: Arc<dyn TargetLocator> = Arc::new(NullTargetLocator);
        let session = SessionController::spawn(capture.clone(), target_locator, clock.clone());

        let hotkey = if opts.enable_hotkey {
            let backend = Box::new(PortalBackend::new());
            match HotkeyMonitor::start(backend, clock.clone(), InputMode::default()).await {
                Ok(monitor) => Some(monitor),
                Err(e) => {
                    warn!(error = %e, "hotkey backend unavailable, running without global hotkey");
                    None
                }
            }
        } else {
            None
        };

        let dispatcher = Dispatcher::spawn(opts.worker_bin, opts.socket_path);

        let vocab_path = opts
            .vocabulary_path
            .or_else(|| fluidvoice_config::config_file_path("vocabulary.jsonc"));
        let vocab_config = match &vocab_path {
            Some(path) => fluidvoice_config::load_or_default::<VocabConfig>(path),
            None => VocabConfig::default(),
        };
        let corrector = Arc::new(VocabularyCorrector::new(&vocab_config));

        let config_watcher = match &vocab_path {
            Some(path) if path.exists() => match ConfigWatcher::watch(path) {
                Ok(watcher) => {
                    let corrector_for_reload = corrector.clone();
                    let path_for_reload = path.clone();
                    watcher.on_change(move |_changed| {
                        let reloaded =
                            fluidvoice_config::load_or_default::<VocabConfig>(&path_for_reload);
                        corrector_for_reload.rebuild(&reloaded);
                        info!("vocabulary config reloaded");
                    });
                    Some(watcher)
                }
                Err(e) => {
                    warn!(error = %e, "failed to watch vocabulary config");
                    None
                }
            },
            _ => None,
        };

        let injector = Arc::new(StrategyManager::new(
            Box::new(SynthesizedTypingInjector::new()),
            Box::new(ClipboardSandwichInjector::new()),
        ));

        Ok(Self {
            session,
            hotkey,
            dispatcher,
            corrector,
            injector,
            _config_watcher: config_watcher,
            request_id: std::sync::atomic::AtomicU64::new(0),
            capture,
            picker,
            current_device_uid,
            _device_monitor: device_monitor,
            device_events,
        })
    }

    /// Runs the glue loop until cancelled: forwards hotkey events into the
    /// session, and performs the transcription/injection work the session
    /// asks for via `SessionEffect`, reporting the outcome back as the
    /// matching `SessionEvent`.
    pub async fn run_until_shutdown(mut self) {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
                hotkey_event = Self::next_hotkey_event(&mut self.hotkey) => {
                    match hotkey_event {
                        Some(HotkeyEvent::Start) => {
                            let _ = self.session.events.send(SessionEvent::HotkeyStart).await;
                        }
                        Some(HotkeyEvent::Stop) => {
                            let _ = self.session.events.send(SessionEvent::HotkeyStop).await;
                        }
                        Some(HotkeyEvent::Toggle) => {
                            let _ = self.session.events.send(SessionEvent::HotkeyToggle).await;
                        }
                        Some(HotkeyEvent::ConfigError(message)) => {
                            error!(%message, "hotkey backend reported an error");
                        }
                        None => {
                            // No hotkey backend running; this branch never
                            // becomes ready (see `next_hotkey_event`).
                        }
                    }
                }
                effect = self.session.effects.recv() => {
                    match effect {
                        Some(SessionEffect::Transcribe(recording)) => {
                            self.spawn_transcribe(recording.pcm);
                        }
                        Some(SessionEffect::Inject { text, target }) => {
                            self.spawn_inject(text, target);
                        }
                        Some(SessionEffect::PrewarmNextDevice) => {
                            self.prewarm_next_device();
                        }
                        None => break,
                    }
                }
                device_event = self.device_events.recv() => {
                    if let Ok(DeviceEvent::CurrentDeviceDisconnected(uid)) = device_event {
                        let error = fluidvoice_foundation::error::AudioError::DeviceLost(uid);
                        warn!(error = %error, "recording device disconnected");
                        let _ = self.session.events.send(SessionEvent::DeviceLost).await;
                    }
                }
            }
        }

        self.session.abort();
    }

    async fn next_hotkey_event(hotkey: &mut Option<HotkeyMonitor>) -> Option<HotkeyEvent> {
        match hotkey {
            Some(monitor) => monitor.recv().await,
            None => std::future::pending().await,
        }
    }

    fn spawn_transcribe(&self, pcm: Vec<i16>) {
        let dispatcher = self.dispatcher.clone();
        let corrector = self.corrector.clone();
        let events = self.session.events.clone();
        let request_id = self
            .request_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        tokio::spawn(async move {
            let result = dispatcher
                .transcribe(request_id, pcm)
                .await
                .map(|text| corrector.correct(&text))
                .map_err(FluidVoiceError::Dispatch);
            let _ = events
                .send(SessionEvent::TranscriptionFinished(result))
                .await;
        });
    }

    fn prewarm_next_device(&self) {
        match self.picker.select(None) {
            Ok(device) => {
                *self.current_device_uid.lock() = device.name().ok();
                if let Err(e) = self.capture.prewarm(device) {
                    warn!(error = %e, "failed to pre-warm replacement device");
                }
            }
            Err(e) => warn!(error = %e, "no replacement device available after device_lost"),
        }
    }

    fn spawn_inject(&self, text: String, target: fluidvoice_inject::AppTarget) {
        let injector = self.injector.clone();
        let events = self.session.events.clone();

        tokio::spawn(async move {
            let result = injector
                .inject_with_fallback(&text, &target)
                .await
                .map(|_| ())
                .map_err(FluidVoiceError::Injection);
            let _ = events.send(SessionEvent::InjectionAcked(result)).await;
        });
    }
}
