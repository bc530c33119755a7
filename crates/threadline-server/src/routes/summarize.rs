use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use threadline_schema::ErrorBody;

use super::{decode_body, error_response, method_not_allowed};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/summarize", post(summarize).fallback(method_not_allowed))
}

async fn summarize(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(request) = decode_body::<SummarizeRequest>(&body) else {
        return failed();
    };
    let Some(api_key) = request.api_key.filter(|k| !k.trim().is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorBody::new("Gemini API key is required"),
        );
    };
    let Some(content) = request.content.filter(|c| !c.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, ErrorBody::new("Content is required"));
    };

    match state.pipeline.digest(api_key.trim(), &content).await {
        Ok(summary) => Json(SummarizeResponse { summary }).into_response(),
        Err(e) => {
            tracing::error!("summarize failed: {e:#}");
            failed()
        }
    }
}

fn failed() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody::new("Failed to summarize content"),
    )
}
