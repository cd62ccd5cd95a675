//! Streaming resample + downmix from the device's native rate/channel count
//! to the 16 kHz mono contract every downstream consumer expects.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

#[derive(Debug, Clone, Copy)]
pub enum ResamplerQuality {
    Fast,
    Balanced,
    Quality,
}

fn sinc_params(quality: ResamplerQuality) -> SincInterpolationParameters {
    match quality {
        ResamplerQuality::Fast => SincInterpolationParameters {
            sinc_len: 32,
            f_cutoff: 0.92,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 64,
            window: WindowFunction::Blackman,
        },
        ResamplerQuality::Balanced => SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 128,
            window: WindowFunction::Blackman2,
        },
        ResamplerQuality::Quality => SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.97,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        },
    }
}

pub struct StreamResampler {
    in_rate: u32,
    out_rate: u32,
    channels: u16,
    resampler: Option<SincFixedIn<f32>>,
    input_buffer: Vec<f32>,
    output_buffer: Vec<f32>,
    chunk_size: usize,
}

impl StreamResampler {
    pub fn new(in_rate: u32, channels: u16, out_rate: u32, quality: ResamplerQuality) -> Self {
        let chunk_size = 512;
        let resampler = if in_rate == out_rate {
            None
        } else {
            Some(
                SincFixedIn::<f32>::new(
                    out_rate as f64 / in_rate as f64,
                    2.0,
                    sinc_params(quality),
                    chunk_size,
                    1,
                )
                .expect("resampler ratio/params are always valid for supported device rates"),
            )
        };
        Self {
            in_rate,
            out_rate,
            channels: channels.max(1),
            resampler,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            output_buffer: Vec::new(),
            chunk_size,
        }
    }

    /// Downmixes interleaved multi-channel i16 input to mono, then resamples
    /// to the configured output rate. Returns freshly resampled i16 mono.
    pub fn process(&mut self, interleaved: &[i16]) -> Vec<i16> {
        let mono: Vec<f32> = if self.channels <= 1 {
            interleaved.iter().map(|&s| s as f32 / 32768.0).collect()
        } else {
            interleaved
                .chunks_exact(self.channels as usize)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum as f32 / frame.len() as f32) / 32768.0
                })
                .collect()
        };

        let Some(resampler) = self.resampler.as_mut() else {
            return mono
                .into_iter()
                .map(|s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
                .collect();
        };

        self.input_buffer.extend(mono);

        while self.input_buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            let frames = vec![chunk];
            match resampler.process(&frames, None) {
                Ok(out_frames) => {
                    if let Some(ch0) = out_frames.first() {
                        self.output_buffer.extend_from_slice(ch0);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "resampler error, dropping chunk");
                }
            }
        }

        let result: Vec<i16> = self
            .output_buffer
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
            .collect();
        self.output_buffer.clear();
        result
    }

    pub fn reset(&mut self) {
        self.input_buffer.clear();
        self.output_buffer.clear();
        if let Some(r) = self.resampler.as_mut() {
            r.reset();
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.out_rate
    }
}
