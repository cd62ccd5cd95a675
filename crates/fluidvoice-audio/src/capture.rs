//! Capture engine: owns the cpal stream, keeps a pre-warmed device handle so
//! recording can start with no audible open-device latency, and snapshots
//! the ring buffer into a `Recording` on stop.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use fluidvoice_foundation::error::AudioError;
use fluidvoice_foundation::format::AudioConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::resampler::{ResamplerQuality, StreamResampler};
use crate::ring_buffer::{AudioConsumer, AudioProducer, AudioRingBuffer};

#[derive(Debug, Clone)]
pub struct Recording {
    pub started_at: Instant,
    pub stopped_at: Instant,
    pub pcm: Vec<i16>,
    pub truncated: bool,
}

enum EngineState {
    PreWarmed { device: Device, config: StreamConfig },
    Running { stream: Stream },
}

// cpal::Stream is conservatively !Send/!Sync (to accommodate Android's AAudio
// API), but on this crate's supported desktop backends a `Stream` is only
// ever touched while holding `CaptureEngine::state`'s mutex, so treating it
// as Send+Sync here doesn't introduce any actual data race.
unsafe impl Send for EngineState {}
unsafe impl Sync for EngineState {}

/// The capture surface `SessionController` depends on, kept separate from
/// `CaptureEngine`'s device-management API (`prewarm`) so the session
/// actor can be driven by a test double instead of real cpal hardware.
pub trait CaptureSource: Send + Sync {
    fn start_recording(&self) -> Result<(), AudioError>;
    fn stop_recording(&self) -> Recording;
    fn current_level(&self) -> f32;
}

/// Owns exactly one cpal input stream at a time and exposes
/// start/stop-to-`Recording` semantics on top of it.
///
/// The ring buffer holds raw samples in the device's native rate and
/// channel count. Resampling to the 16 kHz mono contract happens once, on
/// `stop_recording`, off the real-time thread: the audio callback must not
/// block or allocate (§4.3), and `StreamResampler::process` allocates.
pub struct CaptureEngine {
    state: Mutex<Option<EngineState>>,
    producer: Arc<Mutex<AudioProducer>>,
    consumer: Mutex<AudioConsumer>,
    truncated: Arc<AtomicBool>,
    level_milli: Arc<AtomicU32>,
    config: AudioConfig,
    started_at: Mutex<Option<Instant>>,
    stream_format: Mutex<Option<(u32, u16)>>,
}

impl CaptureEngine {
    pub fn new(config: AudioConfig) -> Self {
        let (producer, consumer) = AudioRingBuffer::new(config.capture_buffer_samples).split();
        Self {
            state: Mutex::new(None),
            producer: Arc::new(Mutex::new(producer)),
            consumer: Mutex::new(consumer),
            truncated: Arc::new(AtomicBool::new(false)),
            level_milli: Arc::new(AtomicU32::new(0)),
            config,
            started_at: Mutex::new(None),
            stream_format: Mutex::new(None),
        }
    }

    /// Opens the device and builds the stream ahead of time without playing
    /// it, so `start_recording` only has to call `Stream::play`.
    pub fn prewarm(&self, device: Device) -> Result<(), AudioError> {
        let supported = device
            .default_input_config()
            .map_err(|_| AudioError::FormatNotSupported("no default input config".into()))?;
        let config: StreamConfig = supported.config();
        *self.state.lock() = Some(EngineState::PreWarmed { device, config });
        Ok(())
    }

    pub fn current_level(&self) -> f32 {
        self.level_milli.load(Ordering::Relaxed) as f32 / 1000.0
    }

    pub fn start_recording(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        let (device, config) = match state.take() {
            Some(EngineState::PreWarmed { device, config }) => (device, config),
            Some(EngineState::Running { stream }) => {
                *state = Some(EngineState::Running { stream });
                return Ok(());
            }
            None => return Err(AudioError::NoDeviceAvailable),
        };

        self.truncated.store(false, Ordering::Relaxed);
        *self.started_at.lock() = Some(Instant::now());

        let sample_format = device
            .default_input_config()
            .map(|c| c.sample_format())
            .unwrap_or(SampleFormat::I16);

        let producer = self.producer.clone();
        let truncated = self.truncated.clone();
        let level = self.level_milli.clone();
        let in_rate = config.sample_rate.0;
        let channels = config.channels;
        *self.stream_format.lock() = Some((in_rate, channels));

        let err_fn = |err| tracing::error!(error = %err, "audio stream error");

        // Thread-local, reused across callbacks so the F32 conversion path
        // never allocates on the real-time thread after its first grow.
        thread_local! {
            static CONVERT_BUFFER: std::cell::RefCell<Vec<i16>> = const { std::cell::RefCell::new(Vec::new()) };
        }

        let stream = match sample_format {
            SampleFormat::F32 => device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _| {
                        CONVERT_BUFFER.with(|buf| {
                            let mut converted = buf.borrow_mut();
                            converted.clear();
                            converted.reserve(data.len());
                            for &s in data {
                                converted.push((s.clamp(-1.0, 1.0) * 32767.0) as i16);
                            }
                            feed(&converted, &producer, &truncated, &level);
                        });
                    },
                    err_fn,
                    None,
                )
                .map_err(AudioError::from)?,
            _ => device
                .build_input_stream(
                    &config,
                    move |data: &[i16], _| {
                        feed(data, &producer, &truncated, &level);
                    },
                    err_fn,
                    None,
                )
                .map_err(AudioError::from)?,
        };

        stream.play().map_err(AudioError::from)?;
        *state = Some(EngineState::Running { stream });
        Ok(())
    }

    pub fn stop_recording(&self) -> Recording {
        let mut state = self.state.lock();
        *state = None;

        let mut consumer = self.consumer.lock();
        let mut raw = Vec::with_capacity(consumer.slots());
        let mut chunk = vec![0i16; 4096];
        loop {
            let n = consumer.read(&mut chunk);
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
        }

        let (in_rate, channels) = self
            .stream_format
            .lock()
            .take()
            .unwrap_or((fluidvoice_foundation::format::SAMPLE_RATE_HZ, 1));
        let mut resampler = StreamResampler::new(
            in_rate,
            channels,
            fluidvoice_foundation::format::SAMPLE_RATE_HZ,
            ResamplerQuality::Balanced,
        );
        let pcm = resampler.process(&raw);

        let started_at = self.started_at.lock().take().unwrap_or_else(Instant::now);
        Recording {
            started_at,
            stopped_at: Instant::now(),
            pcm,
            truncated: self.truncated.load(Ordering::Relaxed),
        }
    }
}

impl CaptureSource for CaptureEngine {
    fn start_recording(&self) -> Result<(), AudioError> {
        CaptureEngine::start_recording(self)
    }

    fn stop_recording(&self) -> Recording {
        CaptureEngine::stop_recording(self)
    }

    fn current_level(&self) -> f32 {
        CaptureEngine::current_level(self)
    }
}

/// Writes raw, unresampled samples straight to the ring buffer. Runs on the
/// cpal callback thread: no locks beyond the producer's, no allocation.
fn feed(
    samples: &[i16],
    producer: &Arc<Mutex<AudioProducer>>,
    truncated: &Arc<AtomicBool>,
    level: &Arc<AtomicU32>,
) {
    if samples.is_empty() {
        return;
    }

    let rms = rms_of(samples);
    level.store((rms * 1000.0) as u32, Ordering::Relaxed);

    if producer.lock().write(samples) {
        truncated.store(true, Ordering::Relaxed);
    }
}

fn rms_of(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    ((sum_sq / samples.len() as f64).sqrt() / i16::MAX as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms_of(&[0; 100]), 0.0);
    }

    #[test]
    fn rms_of_full_scale_is_near_one() {
        let samples = vec![i16::MAX; 100];
        assert!((rms_of(&samples) - 1.0).abs() < 0.01);
    }

    #[test]
    fn stop_without_start_returns_empty_recording() {
        let engine = CaptureEngine::new(AudioConfig::default());
        let rec = engine.stop_recording();
        assert!(rec.pcm.is_empty());
        assert!(!rec.truncated);
    }
}
