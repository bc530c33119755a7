use std::time::Duration;

use threadline_provider::{
    GeminiProvider, LlmProvider, LlmRequest, ProviderError, ProviderErrorKind,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/models/gemini-1.5-flash:generateContent";

fn mock_gemini_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
    })
}

fn mock_gemini_error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "error": {"code": status, "message": message, "status": "ERROR"}
    }))
}

fn provider(server: &MockServer) -> GeminiProvider {
    GeminiProvider::with_base_url("test-key", &server.uri(), Duration::from_secs(5))
}

fn request() -> LlmRequest {
    LlmRequest::simple(
        "gemini-1.5-flash".into(),
        Some("Return JSON only".into()),
        "Extract topics".into(),
    )
}

#[tokio::test]
async fn gemini_chat_sends_key_and_system_instruction() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "systemInstruction": {"parts": [{"text": "Return JSON only"}]},
            "contents": [{"role": "user", "parts": [{"text": "Extract topics"}]}]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(mock_gemini_response("[\"Topic A\"]")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = provider(&server).chat(request()).await.unwrap();

    assert_eq!(resp.text, "[\"Topic A\"]");
    assert_eq!(resp.input_tokens, Some(12));
    assert_eq!(resp.output_tokens, Some(4));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.query(), None);
}

#[tokio::test]
async fn gemini_rate_limit_is_transient_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(mock_gemini_error(429, "Resource has been exhausted"))
        .mount(&server)
        .await;

    let err = provider(&server).chat(request()).await.unwrap_err();
    let provider_err = err.downcast_ref::<ProviderError>().unwrap();

    assert_eq!(provider_err.kind, ProviderErrorKind::RateLimit);
    assert!(provider_err.is_transient());
    assert!(err.to_string().contains("[retryable]"));
    assert!(err.to_string().contains("Resource has been exhausted"));
}

#[tokio::test]
async fn gemini_bad_key_is_not_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(mock_gemini_error(400, "API key not valid"))
        .mount(&server)
        .await;

    let err = provider(&server).chat(request()).await.unwrap_err();
    let provider_err = err.downcast_ref::<ProviderError>().unwrap();

    assert_eq!(provider_err.kind, ProviderErrorKind::InvalidRequest);
    assert!(!provider_err.is_transient());
}

#[tokio::test]
async fn gemini_health_round_trips_tiny_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"parts": [{"text": "Hello, World!"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_gemini_response("Hi")))
        .expect(1)
        .mount(&server)
        .await;

    assert!(provider(&server).health().await.is_ok());
}

#[tokio::test]
async fn gemini_connect_failure_is_transient() {
    let provider = GeminiProvider::with_base_url(
        "SUPERSECRETKEY123",
        "http://127.0.0.1:9",
        Duration::from_secs(2),
    );

    let err = provider.chat(request()).await.unwrap_err();
    let provider_err = err.downcast_ref::<ProviderError>().unwrap();

    assert!(provider_err.is_transient());
    assert!(!format!("{err:#}").contains("SUPERSECRETKEY123"));
    assert!(!format!("{err:#}").contains("generateContent"));
}
