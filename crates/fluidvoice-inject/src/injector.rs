use crate::types::{AppTarget, InjectionOutcome};
use async_trait::async_trait;
use fluidvoice_foundation::error::InjectionError;

#[async_trait]
pub trait TextInjector: Send + Sync {
    fn name(&self) -> &'static str;
    async fn inject(&self, text: &str, target: &AppTarget) -> Result<InjectionOutcome, InjectionError>;
}
