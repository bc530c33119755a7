use threadline_schema::ConceptExtraction;

use crate::error::ExtractError;
use crate::generator::Generator;
use crate::prompts::PromptSet;
use crate::response::parse_concepts;

/// Ask the backend for the salient topics of `transcript`.
///
/// Never fails: transport errors and contract violations come back as a
/// [`ConceptExtraction`] with an empty list and `error` set.
pub async fn extract_concepts(
    generator: &Generator,
    prompts: &PromptSet,
    transcript: &str,
) -> ConceptExtraction {
    match try_extract_concepts(generator, prompts, transcript).await {
        Ok(concepts) => {
            tracing::info!(count = concepts.len(), "concepts extracted");
            ConceptExtraction::ok(concepts)
        }
        Err(e) => {
            tracing::error!(model = generator.model(), error = %e, "concept extraction failed");
            ConceptExtraction::failed(format!("Failed to extract concepts: {e}"))
        }
    }
}

pub async fn try_extract_concepts(
    generator: &Generator,
    prompts: &PromptSet,
    transcript: &str,
) -> Result<Vec<String>, ExtractError> {
    let (system, user) = prompts.concept_prompt(transcript);
    let raw = generator
        .generate("extract_concepts", Some(system), user)
        .await
        .map_err(|e| ExtractError::Backend(format!("{e:#}")))?;

    parse_concepts(&raw).inspect_err(|e| {
        tracing::warn!(response = %raw, error = %e, "concept reply violates contract");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use threadline_provider::{LlmProvider, LlmRequest, LlmResponse, ProviderError, ProviderErrorKind};

    struct Scripted {
        reply: Result<String, ProviderErrorKind>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(LlmResponse::text(text.clone())),
                Err(kind) => Err(ProviderError::new("gemini", *kind, "scripted failure").into()),
            }
        }
    }

    fn generator(reply: Result<String, ProviderErrorKind>) -> (Generator, Arc<Scripted>) {
        let provider = Arc::new(Scripted {
            reply,
            calls: AtomicU32::new(0),
        });
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
        };
        (Generator::new(provider.clone(), "m", 256, retry), provider)
    }

    #[tokio::test]
    async fn fenced_array_is_accepted() {
        let (g, _) = generator(Ok("```json\n[\"Budget Review\", \"Team Offsite\"]\n```".into()));
        let out = extract_concepts(&g, &PromptSet::default(), "transcript").await;
        assert_eq!(out, ConceptExtraction::ok(vec!["Budget Review".into(), "Team Offsite".into()]));
    }

    #[tokio::test]
    async fn non_array_is_reported_without_retry() {
        let (g, provider) = generator(Ok("{\"topics\": [\"A\"]}".into()));
        let out = extract_concepts(&g, &PromptSet::default(), "transcript").await;
        assert!(out.concepts.is_empty());
        assert_eq!(out.error.as_deref(), Some("Failed to extract concepts: Invalid concepts format"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_failure_is_captured() {
        let (g, provider) = generator(Err(ProviderErrorKind::RateLimit));
        let out = extract_concepts(&g, &PromptSet::default(), "transcript").await;
        assert!(out.concepts.is_empty());
        let error = out.error.unwrap();
        assert!(error.starts_with("Failed to extract concepts: "));
        assert!(error.contains("scripted failure"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_array_is_not_an_error() {
        let (g, _) = generator(Ok("[]".into()));
        let out = extract_concepts(&g, &PromptSet::default(), "transcript").await;
        assert_eq!(out, ConceptExtraction::ok(vec![]));
    }
}
