pub mod keys;
pub mod share;
pub mod summarize;
pub mod threads;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::de::DeserializeOwned;
use threadline_schema::ErrorBody;

use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(threads::router())
        .merge(share::router())
        .merge(keys::router())
        .merge(summarize::router())
}

pub(crate) fn error_response(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

/// Decode a JSON body, or `None` when it is empty or malformed. Handlers
/// decide what a missing body means instead of axum rejecting it.
pub(crate) fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("unreadable request body: {e}");
            None
        }
    }
}

pub(crate) async fn method_not_allowed() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        ErrorBody::new("Method not allowed"),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Response};
    use threadline_core::{Pipeline, ThreadlineConfig};
    use threadline_provider::{LlmProvider, LlmRequest, LlmResponse, ProviderFactory};
    use threadline_store::SqliteStore;

    use crate::state::AppState;

    pub const GOOD_KEY: &str = "good-key";

    /// Accepts only [`GOOD_KEY`]; answers concept prompts with two topics,
    /// thread prompts with a discussion and anything else with a digest.
    pub struct Scripted {
        key: String,
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
            if self.key != GOOD_KEY {
                anyhow::bail!("gemini api error (invalid_request): API key not valid");
            }
            let system = request.system.clone().unwrap_or_default();
            let text = if system.contains("JSON array of strings") {
                r#"["Offsite Venue", "Offsite Budget"]"#.to_string()
            } else if system.contains("\"threads\"") {
                r#"{"title": "Offsite", "language": "en", "threads": [{"timestamp": "2024-03-01", "participants": ["Dana"], "summary": "Venue picked."}]}"#.to_string()
            } else {
                "The group planned an offsite.".to_string()
            };
            Ok(LlmResponse::text(text))
        }

        async fn health(&self) -> Result<()> {
            if self.key == GOOD_KEY {
                Ok(())
            } else {
                anyhow::bail!("API key not valid")
            }
        }
    }

    pub struct ScriptedFactory;

    impl ProviderFactory for ScriptedFactory {
        fn create(&self, api_key: &str) -> Arc<dyn LlmProvider> {
            Arc::new(Scripted {
                key: api_key.to_string(),
            })
        }
    }

    pub fn state() -> AppState {
        let pipeline = Pipeline::new(ThreadlineConfig::default(), Arc::new(ScriptedFactory)).unwrap();
        AppState::new(pipeline)
    }

    pub fn state_with_store() -> (AppState, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let pipeline = Pipeline::new(ThreadlineConfig::default(), Arc::new(ScriptedFactory))
            .unwrap()
            .with_store(store.clone());
        (AppState::new(pipeline), store)
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn json_body(response: Response<Body>) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub fn chat_export() -> String {
        [
            "[3/1/24, 9:00 AM] Dana: Can we lock the offsite venue this week?",
            "[3/1/24, 9:05 AM] Lee: I have two quotes, sending them tonight.",
            "[3/2/24, 6:30 PM] Priya: Budget cap is 4k including travel.",
        ]
        .join("\n")
    }
}
