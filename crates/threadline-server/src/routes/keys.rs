use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use threadline_schema::ErrorBody;

use super::{decode_body, error_response, method_not_allowed};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCheckRequest {
    #[serde(default)]
    pub api_key: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/test-api-key",
        post(test_api_key).fallback(method_not_allowed),
    )
}

async fn test_api_key(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(request) = decode_body::<KeyCheckRequest>(&body) else {
        return error_response(StatusCode::BAD_REQUEST, ErrorBody::new("Invalid API key"));
    };
    let Some(api_key) = request.api_key.filter(|k| !k.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, ErrorBody::new("API key is required"));
    };

    match state.pipeline.check_credential(&api_key).await {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(e) => {
            tracing::warn!("credential check failed: {e:#}");
            error_response(StatusCode::BAD_REQUEST, ErrorBody::new("Invalid API key"))
        }
    }
}
