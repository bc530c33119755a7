pub mod error;
pub mod gemini;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub use error::{ProviderError, ProviderErrorKind};
pub use gemini::{GeminiProvider, GEMINI_API_BASE};
pub use types::*;

/// Text-in/text-out generative backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Cheap round-trip proving the credential works.
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds a provider bound to the caller's credential.
///
/// Credentials arrive with each request, so providers are created per
/// analysis rather than registered once at startup.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, api_key: &str) -> Arc<dyn LlmProvider>;
}

#[derive(Debug, Clone)]
pub struct GeminiFactory {
    base_url: String,
    timeout: Duration,
    health_model: String,
}

impl GeminiFactory {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        health_model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            health_model: health_model.into(),
        }
    }
}

impl Default for GeminiFactory {
    fn default() -> Self {
        Self::new(
            GEMINI_API_BASE,
            Duration::from_secs(120),
            gemini::DEFAULT_HEALTH_MODEL,
        )
    }
}

impl ProviderFactory for GeminiFactory {
    fn create(&self, api_key: &str) -> Arc<dyn LlmProvider> {
        Arc::new(
            GeminiProvider::with_base_url(api_key, &self.base_url, self.timeout)
                .with_health_model(&self.health_model),
        )
    }
}
