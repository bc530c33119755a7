//! Analysis orchestration: sanitize, window, extract, summarize, persist.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use threadline_provider::ProviderFactory;
use threadline_schema::{
    AnalysisResult, AnalyzeRequest, ErrorBody, NewAnalysis, ThreadData,
};
use threadline_store::AnalysisStore;
use uuid::Uuid;

use crate::concepts::extract_concepts;
use crate::config::ThreadlineConfig;
use crate::digest::summarize_text;
use crate::generator::Generator;
use crate::prompts::PromptSet;
use crate::sanitize::Sanitizer;
use crate::threads::summarize_all;
use crate::window::filter_to_window;

pub const MSG_KEY_REQUIRED: &str = "Gemini API key is required";
pub const MSG_NO_TOPICS: &str = "No significant topics found in the conversation";
pub const MSG_COMPLETED: &str = "Analysis completed successfully";
pub const MSG_FAILED: &str = "Failed to process chat history";

/// Every way an analysis can end.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Missing credential or unusable content.
    BadRequest(ErrorBody),
    /// Extraction failed, or something unexpected went wrong.
    ServerError(ErrorBody),
    /// The transcript had no significant topics.
    Empty(AnalysisResult),
    Completed(AnalysisResult),
}

impl AnalysisOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisOutcome::BadRequest(_) => 400,
            AnalysisOutcome::ServerError(_) => 500,
            AnalysisOutcome::Empty(_) | AnalysisOutcome::Completed(_) => 200,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Empty(_) | AnalysisOutcome::Completed(_))
    }
}

pub struct Pipeline {
    config: ThreadlineConfig,
    prompts: PromptSet,
    sanitizer: Sanitizer,
    providers: Arc<dyn ProviderFactory>,
    store: Option<Arc<dyn AnalysisStore>>,
}

impl Pipeline {
    pub fn new(config: ThreadlineConfig, providers: Arc<dyn ProviderFactory>) -> Result<Self> {
        config.validate()?;
        let prompts = config.prompts.resolve()?;
        let sanitizer = Sanitizer::from_config(&config.pipeline);
        Ok(Self {
            config,
            prompts,
            sanitizer,
            providers,
            store: None,
        })
    }

    /// Persist every completed analysis to `store`.
    pub fn with_store(mut self, store: Arc<dyn AnalysisStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &ThreadlineConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&Arc<dyn AnalysisStore>> {
        self.store.as_ref()
    }

    fn generator(&self, api_key: &str, model: &str) -> Generator {
        Generator::new(
            self.providers.create(api_key),
            model,
            self.config.provider.max_output_tokens,
            self.config.retry,
        )
    }

    /// Run one analysis. Always returns one of the four outcome shapes.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> AnalysisOutcome {
        let analysis_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(%analysis_id, "analysis started");

        let outcome = match self.run(request, analysis_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(%analysis_id, error = %format!("{e:#}"), "analysis failed");
                AnalysisOutcome::ServerError(ErrorBody::new(MSG_FAILED).with_details(format!("{e:#}")))
            }
        };

        tracing::info!(
            %analysis_id,
            status = outcome.status_code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis finished"
        );
        outcome
    }

    async fn run(&self, request: &AnalyzeRequest, analysis_id: Uuid) -> Result<AnalysisOutcome> {
        let Some(api_key) = request.credential() else {
            tracing::info!(%analysis_id, "rejected: no credential");
            return Ok(AnalysisOutcome::BadRequest(ErrorBody::new(MSG_KEY_REQUIRED)));
        };

        let mut transcript = match self.sanitizer.validate(request.content_text()) {
            Ok(text) => text,
            Err(e) => {
                tracing::info!(%analysis_id, reason = %e, "rejected: content");
                return Ok(AnalysisOutcome::BadRequest(ErrorBody::new(e.to_string())));
            }
        };
        tracing::info!(%analysis_id, chars = transcript.chars().count(), "content sanitized");

        let only_recent = request
            .only_last_month
            .unwrap_or(self.config.pipeline.only_last_month_default);
        if only_recent {
            transcript = filter_to_window(&transcript, None, self.config.pipeline.recency_months);
            tracing::info!(%analysis_id, chars = transcript.chars().count(), "recency window applied");
        }

        let generator = self.generator(api_key, &self.config.provider.model);
        let extraction = extract_concepts(&generator, &self.prompts, &transcript).await;
        if let Some(error) = extraction.error {
            return Ok(AnalysisOutcome::ServerError(ErrorBody::new(error)));
        }
        let concepts = extraction.concepts;
        tracing::info!(%analysis_id, concepts = concepts.len(), "concepts ready");

        if concepts.is_empty() {
            return Ok(AnalysisOutcome::Empty(AnalysisResult {
                concepts,
                threads: vec![],
                message: MSG_NO_TOPICS.to_string(),
                id: None,
            }));
        }

        let threads = summarize_all(
            &generator,
            &self.prompts,
            &transcript,
            &concepts,
            self.config.pipeline.batch_size,
        )
        .await;
        tracing::info!(%analysis_id, threads = threads.len(), "threads summarized");

        let mut result = AnalysisResult {
            concepts,
            threads,
            message: MSG_COMPLETED.to_string(),
            id: None,
        };

        if let Some(store) = &self.store {
            let saved = store
                .save(NewAnalysis {
                    content: request.content_text().unwrap_or_default().to_string(),
                    concepts: result.concepts.clone(),
                    thread_data: ThreadData {
                        threads: result.threads.clone(),
                    },
                })
                .await?;
            tracing::info!(%analysis_id, id = %saved.id, share_id = %saved.share_id, "analysis persisted");
            result.id = Some(saved.id);
        }

        Ok(AnalysisOutcome::Completed(result))
    }

    /// Round-trip a tiny generation to prove `api_key` is accepted.
    pub async fn check_credential(&self, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(anyhow!("API key is required"));
        }
        self.providers.create(api_key).health().await
    }

    /// Free-text digest of `content`.
    pub async fn digest(&self, api_key: &str, content: &str) -> Result<String> {
        let generator = self.generator(api_key, &self.config.provider.digest_model);
        summarize_text(&generator, &self.prompts, content).await
    }
}
