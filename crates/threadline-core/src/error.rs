use thiserror::Error;

/// Why a transcript was refused before any backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Invalid content format")]
    InvalidFormat,

    #[error("Content too short for meaningful analysis")]
    TooShort { min: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    /// Transport or provider failure, after retries.
    #[error("{0}")]
    Backend(String),

    #[error("Invalid concepts JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid concepts format")]
    InvalidConceptsFormat,
}

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("{0}")]
    Backend(String),

    #[error("Invalid thread JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid response structure: {0}")]
    InvalidResponseStructure(String),
}
