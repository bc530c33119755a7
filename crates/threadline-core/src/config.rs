use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::prompts::PromptSet;

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_base_url() -> String {
    threadline_provider::GEMINI_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_output_tokens() -> u32 {
    8192
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Model used for concept extraction and thread summaries.
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used for the free-text digest and credential checks.
    #[serde(default = "default_model")]
    pub digest_model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            digest_model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_min_content_chars() -> usize {
    50
}

fn default_max_content_chars() -> usize {
    100_000
}

fn default_batch_size() -> usize {
    10
}

fn default_recency_months() -> u32 {
    1
}

/// Content bounds, batching and recency window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// Concepts summarized concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_recency_months")]
    pub recency_months: u32,
    /// Applied when a request does not say whether to filter.
    #[serde(default)]
    pub only_last_month_default: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_content_chars: default_min_content_chars(),
            max_content_chars: default_max_content_chars(),
            batch_size: default_batch_size(),
            recency_months: default_recency_months(),
            only_last_month_default: false,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay slept before the retry that follows attempt `attempt_index` (0-based).
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt_index).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

fn default_prompt_version() -> String {
    "v1".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptOverrides {
    #[serde(default)]
    pub concept_system: Option<String>,
    #[serde(default)]
    pub concept_user: Option<String>,
    #[serde(default)]
    pub thread_system: Option<String>,
    #[serde(default)]
    pub thread_user: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompt_version")]
    pub version: String,
    #[serde(flatten)]
    pub overrides: PromptOverrides,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            version: default_prompt_version(),
            overrides: PromptOverrides::default(),
        }
    }
}

impl PromptConfig {
    pub fn resolve(&self) -> Result<PromptSet> {
        let mut set = PromptSet::builtin(&self.version)
            .ok_or_else(|| anyhow!("unknown prompt version: {}", self.version))?;
        let o = &self.overrides;
        if let Some(t) = &o.concept_system {
            set.concept_system = t.clone();
        }
        if let Some(t) = &o.concept_user {
            set.concept_user = t.clone();
        }
        if let Some(t) = &o.thread_system {
            set.thread_system = t.clone();
        }
        if let Some(t) = &o.thread_user {
            set.thread_user = t.clone();
        }
        if let Some(t) = &o.digest {
            set.digest = t.clone();
        }
        Ok(set)
    }
}

fn default_db_path() -> String {
    "data/threadline.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadlineConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub prompts: PromptConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl ThreadlineConfig {
    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        if p.batch_size == 0 {
            return Err(anyhow!("pipeline.batch_size must be at least 1"));
        }
        if p.min_content_chars >= p.max_content_chars {
            return Err(anyhow!(
                "pipeline.min_content_chars ({}) must be below max_content_chars ({})",
                p.min_content_chars,
                p.max_content_chars
            ));
        }
        if p.recency_months == 0 {
            return Err(anyhow!("pipeline.recency_months must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be at least 1"));
        }
        if self.provider.model.trim().is_empty() {
            return Err(anyhow!("provider.model must not be empty"));
        }
        self.prompts.resolve()?;
        Ok(())
    }
}

/// Load config from a YAML file; a missing file yields defaults.
pub fn load_config(path: &Path) -> Result<ThreadlineConfig> {
    if !path.exists() {
        tracing::info!("config file {} not found, using defaults", path.display());
        return Ok(ThreadlineConfig::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: ThreadlineConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
