pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use threadline_schema::{NewAnalysis, SavedAnalysis, StoredAnalysis};

pub use sqlite::SqliteStore;

/// Record store for completed analyses.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Inserts one record and returns its private id and public share id.
    async fn save(&self, record: NewAnalysis) -> Result<SavedAnalysis>;
    async fn get_by_id(&self, id: &str) -> Result<Option<StoredAnalysis>>;
    async fn get_by_share_id(&self, share_id: &str) -> Result<Option<StoredAnalysis>>;
}
