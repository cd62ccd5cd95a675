//! Orchestrates injection strategies: tries the primary strategy first,
//! falls back to the secondary on an `Unavailable`/`MethodFailed` error,
//! wrapped in a global budget and a per-backend soft timeout.

use crate::injector::TextInjector;
use crate::types::{AppTarget, InjectionOutcome};
use fluidvoice_foundation::error::InjectionError;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

const GLOBAL_INJECTION_BUDGET: Duration = Duration::from_secs(3);
const PER_BACKEND_SOFT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct StrategyManager {
    primary: Box<dyn TextInjector>,
    secondary: Box<dyn TextInjector>,
}

impl StrategyManager {
    pub fn new(primary: Box<dyn TextInjector>, secondary: Box<dyn TextInjector>) -> Self {
        Self { primary, secondary }
    }

    pub async fn inject_with_fallback(
        &self,
        text: &str,
        target: &AppTarget,
    ) -> Result<InjectionOutcome, InjectionError> {
        let overall_start = std::time::Instant::now();
        match timeout(GLOBAL_INJECTION_BUDGET, self.try_strategies(text, target)).await {
            Ok(result) => result,
            Err(_) => Err(InjectionError::Timeout(overall_start.elapsed())),
        }
    }

    async fn try_strategies(
        &self,
        text: &str,
        target: &AppTarget,
    ) -> Result<InjectionOutcome, InjectionError> {
        match self.try_once(self.primary.as_ref(), text, target).await {
            Ok(outcome) => {
                info!(backend = self.primary.name(), "injection succeeded");
                Ok(outcome)
            }
            Err(InjectionError::Unavailable) | Err(InjectionError::MethodFailed(_)) => {
                warn!(backend = self.primary.name(), "primary strategy failed, falling back");
                self.try_once(self.secondary.as_ref(), text, target).await
            }
            Err(e) => Err(e),
        }
    }

    async fn try_once(
        &self,
        injector: &dyn TextInjector,
        text: &str,
        target: &AppTarget,
    ) -> Result<InjectionOutcome, InjectionError> {
        match timeout(PER_BACKEND_SOFT_TIMEOUT, injector.inject(text, target)).await {
            Ok(result) => result,
            Err(_) => Err(InjectionError::Timeout(PER_BACKEND_SOFT_TIMEOUT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyInjector {
        calls: Arc<AtomicUsize>,
        fails: bool,
    }

    #[async_trait]
    impl TextInjector for FlakyInjector {
        fn name(&self) -> &'static str {
            if self.fails {
                "flaky-primary"
            } else {
                "reliable-secondary"
            }
        }

        async fn inject(
            &self,
            _text: &str,
            _target: &AppTarget,
        ) -> Result<InjectionOutcome, InjectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                Err(InjectionError::Unavailable)
            } else {
                Ok(InjectionOutcome::Injected)
            }
        }
    }

    fn target() -> AppTarget {
        AppTarget {
            pid: 1,
            process_name: "test".to_string(),
            activation_verified_at: None,
        }
    }

    #[tokio::test]
    async fn falls_back_to_secondary_when_primary_unavailable() {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let secondary_calls = Arc::new(AtomicUsize::new(0));
        let manager = StrategyManager::new(
            Box::new(FlakyInjector {
                calls: primary_calls.clone(),
                fails: true,
            }),
            Box::new(FlakyInjector {
                calls: secondary_calls.clone(),
                fails: false,
            }),
        );

        let outcome = manager.inject_with_fallback("hello", &target()).await.unwrap();
        assert_eq!(outcome, InjectionOutcome::Injected);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn skips_secondary_when_primary_succeeds() {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let secondary_calls = Arc::new(AtomicUsize::new(0));
        let manager = StrategyManager::new(
            Box::new(FlakyInjector {
                calls: primary_calls.clone(),
                fails: false,
            }),
            Box::new(FlakyInjector {
                calls: secondary_calls.clone(),
                fails: false,
            }),
        );

        manager.inject_with_fallback("hello", &target()).await.unwrap();
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }
}
