//! Verifies the target application is frontmost before injection proceeds,
//! generalizing the focus tracker's cache-and-check shape into an
//! activation poll: some window managers need a beat after an activation
//! request before the frontmost window actually changes.

use crate::types::AppTarget;
use fluidvoice_foundation::error::InjectionError;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MAX_POLLS: u32 = 10;

/// Abstraction over "is this process the frontmost window", so the poll
/// loop can be tested without a real window manager.
pub trait FrontmostChecker: Send + Sync {
    fn is_frontmost(&self, pid: u32) -> bool;
}

/// Abstraction over "which window is currently frontmost", used by the
/// session controller to snapshot the target application the instant a
/// recording starts.
pub trait TargetLocator: Send + Sync {
    fn current_target(&self) -> Option<AppTarget>;
}

/// Default locator for builds with no accessibility backend wired in —
/// mirrors `FocusStatus::Unknown`, the teacher's own fallback when its
/// `atspi` feature is disabled. Recording still proceeds; injection just
/// runs without a verified activation target.
pub struct NullTargetLocator;

impl TargetLocator for NullTargetLocator {
    fn current_target(&self) -> Option<AppTarget> {
        None
    }
}

pub async fn activate_and_verify(
    checker: &dyn FrontmostChecker,
    target: &mut AppTarget,
) -> Result<(), InjectionError> {
    for _ in 0..MAX_POLLS {
        if checker.is_frontmost(target.pid) {
            target.activation_verified_at = Some(Instant::now());
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Err(InjectionError::ActivationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingChecker {
        succeed_after: u32,
        attempts: AtomicU32,
    }

    impl FrontmostChecker for CountingChecker {
        fn is_frontmost(&self, _pid: u32) -> bool {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            n >= self.succeed_after
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_once_frontmost() {
        let checker = CountingChecker {
            succeed_after: 2,
            attempts: AtomicU32::new(0),
        };
        let mut target = AppTarget {
            pid: 42,
            process_name: "editor".to_string(),
            activation_verified_at: None,
        };
        activate_and_verify(&checker, &mut target).await.unwrap();
        assert!(target.activation_verified_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_polls() {
        let checker = CountingChecker {
            succeed_after: u32::MAX,
            attempts: AtomicU32::new(0),
        };
        let mut target = AppTarget {
            pid: 42,
            process_name: "editor".to_string(),
            activation_verified_at: None,
        };
        let result = activate_and_verify(&checker, &mut target).await;
        assert!(matches!(result, Err(InjectionError::ActivationFailed)));
    }
}
