use std::sync::Arc;

use threadline_core::Pipeline;

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Configured analysis pipeline, including the record store when
    /// persistence is enabled.
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
