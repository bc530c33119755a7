//! Google Gemini API provider
//!
//! https://ai.google.dev/api/generate-content

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    LlmProvider, LlmRequest, LlmResponse, ProviderError, ProviderErrorKind, Role,
};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_HEALTH_MODEL: &str = "gemini-1.5-flash";

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    health_model: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, GEMINI_API_BASE, Duration::from_secs(120))
    }

    pub fn with_base_url(api_key: impl Into<String>, api_base: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            health_model: DEFAULT_HEALTH_MODEL.to_string(),
        }
    }

    pub fn with_health_model(mut self, model: &str) -> Self {
        self.health_model = model.to_string();
        self
    }

    fn build_request(&self, request: &LlmRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .filter(|msg| !msg.text.is_empty())
            .map(|msg| GeminiContent {
                role: match msg.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "model".to_string(),
                },
                parts: vec![GeminiPart {
                    text: msg.text.clone(),
                }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: request.system.as_ref().map(|s| GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: s.clone() }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(request.max_tokens),
                temperature: request.temperature,
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base, request.model
        );

        let payload = self.build_request(&request);

        let resp = match self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(ProviderError::new(
                    PROVIDER,
                    ProviderErrorKind::Timeout,
                    "request timed out",
                )
                .into());
            }
            Err(e) if e.is_connect() => {
                let message = e.without_url().to_string();
                tracing::warn!(model = %request.model, "gemini connect failed: {message}");
                return Err(ProviderError::new(PROVIDER, ProviderErrorKind::Connect, message).into());
            }
            Err(e) => return Err(e.without_url().into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            let message = api_error_message(&text);
            tracing::warn!(model = %request.model, %status, "gemini api error: {message}");
            return Err(ProviderError::from_status(PROVIDER, status, &message).into());
        }

        let body: GeminiResponse = resp.json().await.map_err(|e| e.without_url())?;
        Ok(to_llm_response(body)?)
    }

    async fn health(&self) -> Result<()> {
        let request = LlmRequest::simple(
            self.health_model.clone(),
            None,
            "Hello, World!".to_string(),
        )
        .with_max_tokens(16);
        self.chat(request).await.map(|_| ())
    }
}

fn to_llm_response(body: GeminiResponse) -> std::result::Result<LlmResponse, ProviderError> {
    let candidate = body.candidates.first().ok_or_else(|| {
        ProviderError::new(
            PROVIDER,
            ProviderErrorKind::EmptyResponse,
            "empty response from gemini api",
        )
    })?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    let stop_reason = match candidate.finish_reason.as_deref() {
        Some("STOP") => Some("end_turn".to_string()),
        Some("MAX_TOKENS") => Some("max_tokens".to_string()),
        Some("SAFETY") => Some("safety".to_string()),
        Some(r) => Some(r.to_lowercase()),
        None => None,
    };

    if text.is_empty() {
        return Err(ProviderError::new(
            PROVIDER,
            ProviderErrorKind::EmptyResponse,
            format!(
                "candidate carried no text (finish_reason={})",
                stop_reason.as_deref().unwrap_or("none")
            ),
        ));
    }

    Ok(LlmResponse {
        text,
        input_tokens: body.usage_metadata.as_ref().map(|u| u.prompt_token_count),
        output_tokens: body
            .usage_metadata
            .as_ref()
            .map(|u| u.candidates_token_count),
        stop_reason,
    })
}

/// Pulls `error.message` out of a Gemini error body, falling back to the raw text.
fn api_error_message(text: &str) -> String {
    serde_json::from_str::<GeminiErrorBody>(text)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| text.to_string())
}

// ============================================================
// Gemini API Types
// ============================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmMessage;

    #[test]
    fn build_request_basic() {
        let provider = GeminiProvider::new("test-key");
        let req = LlmRequest::simple("gemini-pro".into(), Some("Be helpful".into()), "Hi".into());
        let api_req = provider.build_request(&req);

        assert!(api_req.system_instruction.is_some());
        assert_eq!(api_req.contents.len(), 1);
        assert_eq!(api_req.contents[0].role, "user");
    }

    #[test]
    fn build_request_maps_assistant_to_model_role() {
        let provider = GeminiProvider::new("test-key");
        let req = LlmRequest {
            model: "gemini-pro".into(),
            system: None,
            messages: vec![
                LlmMessage::user("question"),
                LlmMessage::assistant("answer"),
                LlmMessage::user(""),
            ],
            max_tokens: 100,
            temperature: Some(0.2),
        };
        let api_req = provider.build_request(&req);

        assert!(api_req.system_instruction.is_none());
        assert_eq!(api_req.contents.len(), 2);
        assert_eq!(api_req.contents[1].role, "model");

        let json = serde_json::to_value(&api_req).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 100);
    }

    #[test]
    fn to_llm_response_text_only() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello"}, {"text": "!"}]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 5,
                "candidatesTokenCount": 2
            }
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        let resp = to_llm_response(parsed).unwrap();

        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(resp.input_tokens, Some(5));
        assert_eq!(resp.output_tokens, Some(2));
    }

    #[test]
    fn to_llm_response_empty_candidates_fails() {
        let parsed: GeminiResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        let err = to_llm_response(parsed).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::EmptyResponse);
        assert!(!err.is_transient());
    }

    #[test]
    fn to_llm_response_safety_block_without_text_fails() {
        let parsed: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = to_llm_response(parsed).unwrap_err();
        assert!(err.message.contains("safety"));
    }

    #[test]
    fn api_error_message_prefers_structured_body() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(api_error_message(body), "Resource has been exhausted");
        assert_eq!(api_error_message("upstream hiccup"), "upstream hiccup");
    }
}
