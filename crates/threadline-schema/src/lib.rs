use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_LANGUAGE: &str = "en";
pub const ERROR_TITLE_PREFIX: &str = "Error Processing: ";

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Treats an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body accepted by the analysis endpoint.
///
/// `content` stays an untyped JSON value so a non-string payload can be
/// reported as an invalid format instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub only_last_month: Option<bool>,
}

impl AnalyzeRequest {
    pub fn new(content: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            content: Some(serde_json::Value::String(content.into())),
            api_key: Some(api_key.into()),
            only_last_month: None,
        }
    }

    pub fn with_only_last_month(mut self, enabled: bool) -> Self {
        self.only_last_month = Some(enabled);
        self
    }

    /// Text content, if the payload carried a JSON string.
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_ref().and_then(|v| v.as_str())
    }

    /// Credential, ignoring blank strings.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Outcome of the concept extraction stage. Never an `Err`: failures are
/// carried in `error` with an empty concept list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptExtraction {
    pub concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConceptExtraction {
    pub fn ok(concepts: Vec<String>) -> Self {
        Self {
            concepts,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            concepts: vec![],
            error: Some(error.into()),
        }
    }
}

/// Structured summary of everything said about one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDiscussion {
    pub title: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub threads: Vec<SubThread>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub related_topics: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub follow_ups: Vec<FollowUp>,
    /// Set when the concept was only mentioned in passing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ThreadDiscussion {
    /// Degraded entry used when summarizing a single concept failed.
    pub fn placeholder(concept: &str) -> Self {
        Self {
            title: format!("{ERROR_TITLE_PREFIX}{concept}"),
            language: default_language(),
            threads: vec![],
            related_topics: vec![],
            follow_ups: vec![],
            notes: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.title.starts_with(ERROR_TITLE_PREFIX) && self.threads.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubThread {
    pub timestamp: String,
    pub participants: Vec<String>,
    pub summary: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attachments: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub unresolved_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// "Pending", "In Progress" or "Completed" by convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One concept paired with its discussion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub concept: String,
    pub discussion: ThreadDiscussion,
}

/// Response body of a successful (possibly empty) analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub concepts: Vec<String>,
    pub threads: Vec<ThreadResponse>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadData {
    pub threads: Vec<ThreadResponse>,
}

/// Record handed to the store after a completed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnalysis {
    pub content: String,
    pub concepts: Vec<String>,
    pub thread_data: ThreadData,
}

/// Keys assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAnalysis {
    pub id: String,
    pub share_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: String,
    pub share_id: String,
    pub content: String,
    pub concepts: Vec<String>,
    pub thread_data: ThreadData,
    pub created_at: DateTime<Utc>,
}
