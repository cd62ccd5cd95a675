//! Secondary injection strategy: snapshot the clipboard, write the
//! transcript, synthesize a paste chord, then restore the original
//! clipboard contents. The restore happens on every exit path via a drop
//! guard, since the clipboard must never be left holding FluidVoice's own
//! text (invariant: clipboard preservation).

use crate::injector::TextInjector;
use crate::types::{AppTarget, InjectionOutcome};
use arboard::Clipboard;
use async_trait::async_trait;
use enigo::{Enigo, Key, Keyboard, Settings};
use fluidvoice_foundation::error::InjectionError;
use std::time::Duration;
use tokio::sync::Mutex;

const RESTORE_DELAY: Duration = Duration::from_millis(150);

pub struct ClipboardSandwichInjector {
    lock: Mutex<()>,
}

impl ClipboardSandwichInjector {
    pub fn new() -> Self {
        Self { lock: Mutex::new(()) }
    }
}

impl Default for ClipboardSandwichInjector {
    fn default() -> Self {
        Self::new()
    }
}

struct ClipboardRestoreGuard {
    previous: Option<String>,
}

impl Drop for ClipboardRestoreGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Ok(mut clipboard) = Clipboard::new() {
                if let Err(e) = clipboard.set_text(previous) {
                    tracing::warn!(error = %e, "failed to restore clipboard after injection");
                }
            }
        }
    }
}

#[async_trait]
impl TextInjector for ClipboardSandwichInjector {
    fn name(&self) -> &'static str {
        "clipboard-sandwich"
    }

    async fn inject(&self, text: &str, _target: &AppTarget) -> Result<InjectionOutcome, InjectionError> {
        let _guard = self.lock.lock().await;
        let text = text.to_string();

        let restore = tokio::task::spawn_blocking(move || -> Result<ClipboardRestoreGuard, InjectionError> {
            let mut clipboard =
                Clipboard::new().map_err(|e| InjectionError::Clipboard(e.to_string()))?;
            let previous = clipboard.get_text().ok();
            clipboard
                .set_text(text)
                .map_err(|e| InjectionError::Clipboard(e.to_string()))?;
            Ok(ClipboardRestoreGuard { previous })
        })
        .await
        .map_err(|_| InjectionError::Timeout(Duration::from_secs(0)))??;

        let paste_result = tokio::task::spawn_blocking(|| -> Result<(), InjectionError> {
            let mut enigo = Enigo::new(&Settings::default())
                .map_err(|e| InjectionError::MethodFailed(e.to_string()))?;
            enigo
                .key(Key::Control, enigo::Direction::Press)
                .map_err(|e| InjectionError::MethodFailed(e.to_string()))?;
            enigo
                .key(Key::Unicode('v'), enigo::Direction::Click)
                .map_err(|e| InjectionError::MethodFailed(e.to_string()))?;
            enigo
                .key(Key::Control, enigo::Direction::Release)
                .map_err(|e| InjectionError::MethodFailed(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|_| InjectionError::Timeout(Duration::from_secs(0)))?;

        tokio::time::sleep(RESTORE_DELAY).await;
        drop(restore);

        paste_result?;
        Ok(InjectionOutcome::InjectedViaFallback)
    }
}
