//! Primary injection strategy: synthesize keystrokes for the transcript in
//! bounded chunks, generalized from the enigo injector's per-character
//! loop into chunked unicode text entry with an inter-chunk pause so the
//! target application's input queue isn't overwhelmed.

use crate::injector::TextInjector;
use crate::types::{AppTarget, InjectionOutcome};
use async_trait::async_trait;
use enigo::{Enigo, Keyboard, Settings};
use fluidvoice_foundation::error::InjectionError;
use std::time::Duration;

const CHUNK_SIZE: usize = 100;
const INTER_CHUNK_DELAY: Duration = Duration::from_millis(10);

pub struct SynthesizedTypingInjector;

impl SynthesizedTypingInjector {
    pub fn new() -> Self {
        Self
    }

    fn chunks(text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(CHUNK_SIZE)
            .map(|c| c.iter().collect())
            .collect()
    }
}

impl Default for SynthesizedTypingInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextInjector for SynthesizedTypingInjector {
    fn name(&self) -> &'static str {
        "synthesized-typing"
    }

    async fn inject(&self, text: &str, _target: &AppTarget) -> Result<InjectionOutcome, InjectionError> {
        if text.is_empty() {
            return Ok(InjectionOutcome::Injected);
        }
        let chunks = Self::chunks(text);
        tokio::task::spawn_blocking(move || -> Result<(), InjectionError> {
            let mut enigo = Enigo::new(&Settings::default())
                .map_err(|e| InjectionError::MethodFailed(e.to_string()))?;
            for (i, chunk) in chunks.iter().enumerate() {
                enigo
                    .text(chunk)
                    .map_err(|e| InjectionError::MethodFailed(e.to_string()))?;
                if i + 1 < chunks.len() {
                    std::thread::sleep(INTER_CHUNK_DELAY);
                }
            }
            Ok(())
        })
        .await
        .map_err(|_| InjectionError::Timeout(Duration::from_secs(0)))??;

        Ok(InjectionOutcome::Injected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_size_bound() {
        let text = "a".repeat(250);
        let chunks = SynthesizedTypingInjector::chunks(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 100);
        assert_eq!(chunks[2].chars().count(), 50);
    }
}
