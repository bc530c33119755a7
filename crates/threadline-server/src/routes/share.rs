use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};

use super::threads::{lookup_response, not_found};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/share/{share_id}", get(get_shared))
}

/// Public lookup by share id. The private id never resolves here.
async fn get_shared(State(state): State<AppState>, Path(share_id): Path<String>) -> Response {
    let Some(store) = state.pipeline.store() else {
        return not_found();
    };
    lookup_response(store.get_by_share_id(&share_id).await)
}
