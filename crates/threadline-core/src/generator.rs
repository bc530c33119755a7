use std::sync::Arc;

use anyhow::{anyhow, Result};
use threadline_provider::{LlmProvider, LlmRequest};

use crate::config::RetryPolicy;
use crate::retry::with_retry;

/// One provider bound to a model, with the retry policy applied to every
/// call.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl Generator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        max_tokens: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
            retry,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Send one prompt pair and return the reply text.
    pub async fn generate(&self, label: &str, system: Option<String>, user: String) -> Result<String> {
        let request = LlmRequest::simple(self.model.clone(), system, user).with_max_tokens(self.max_tokens);
        let response = with_retry(self.retry, label, || {
            let provider = self.provider.clone();
            let request = request.clone();
            async move { provider.chat(request).await }
        })
        .await?;

        if response.text.trim().is_empty() {
            return Err(anyhow!("Empty response from {} backend", self.model));
        }
        Ok(response.text)
    }
}
