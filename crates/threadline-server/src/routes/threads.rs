use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use threadline_core::AnalysisOutcome;
use threadline_schema::{AnalyzeRequest, ErrorBody, StoredAnalysis};

use super::{decode_body, error_response, method_not_allowed};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/threads", post(analyze).fallback(method_not_allowed))
        .route("/threads/{id}", get(get_analysis))
}

/// Run an analysis. Any unreadable body is treated as an empty request so
/// the pipeline reports what is missing.
pub async fn analyze(State(state): State<AppState>, body: Bytes) -> Response {
    let request: AnalyzeRequest = decode_body(&body).unwrap_or_default();
    outcome_response(state.pipeline.analyze(&request).await)
}

fn outcome_response(outcome: AnalysisOutcome) -> Response {
    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match outcome {
        AnalysisOutcome::BadRequest(body) | AnalysisOutcome::ServerError(body) => {
            error_response(status, body)
        }
        AnalysisOutcome::Empty(result) => (status, Json(result)).into_response(),
        AnalysisOutcome::Completed(result) => {
            (status, [(header::CACHE_CONTROL, "no-store")], Json(result)).into_response()
        }
    }
}

async fn get_analysis(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(store) = state.pipeline.store() else {
        return not_found();
    };
    lookup_response(store.get_by_id(&id).await)
}

pub(crate) fn lookup_response(found: anyhow::Result<Option<StoredAnalysis>>) -> Response {
    match found {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!("analysis lookup failed: {e:#}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Failed to load analysis").with_details(format!("{e:#}")),
            )
        }
    }
}

pub(crate) fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, ErrorBody::new("Analysis not found"))
}
