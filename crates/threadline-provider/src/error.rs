use std::fmt;

use reqwest::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimit,
    ServiceUnavailable,
    ServerError,
    Timeout,
    Connect,
    AuthError,
    InvalidRequest,
    EmptyResponse,
    Unknown,
}

impl ProviderErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            503 => Self::ServiceUnavailable,
            401 | 403 => Self::AuthError,
            400 | 404 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Transient conditions are worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::ServiceUnavailable | Self::ServerError | Self::Timeout | Self::Connect
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::ServiceUnavailable => "service_unavailable",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::AuthError => "auth_error",
            Self::InvalidRequest => "invalid_request",
            Self::EmptyResponse => "empty_response",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn retry_marker(kind: &ProviderErrorKind) -> &'static str {
    if kind.is_transient() {
        " [retryable]"
    } else {
        ""
    }
}

/// Failure reported by a backend call.
///
/// The rendered message keeps the `[retryable]` marker so callers that only
/// see the string form can still classify it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{provider} api error ({label}){}: {message}", retry_marker(.kind))]
pub struct ProviderError {
    pub provider: &'static str,
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub label: String,
    pub message: String,
}

impl ProviderError {
    pub fn from_status(provider: &'static str, status: StatusCode, body: &str) -> Self {
        Self {
            provider,
            kind: ProviderErrorKind::from_status(status),
            status: Some(status.as_u16()),
            label: status.to_string(),
            message: body.trim().to_string(),
        }
    }

    pub fn new(provider: &'static str, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            status: None,
            label: kind.as_str().to_string(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient_and_marked() {
        let err = ProviderError::from_status("gemini", StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.kind, ProviderErrorKind::RateLimit);
        assert!(err.is_transient());
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("[retryable]"));
        assert!(text.ends_with("slow down"));
    }

    #[test]
    fn unavailable_is_transient() {
        let err = ProviderError::from_status("gemini", StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.kind, ProviderErrorKind::ServiceUnavailable);
        assert!(err.is_transient());
    }

    #[test]
    fn auth_error_is_not_transient() {
        let err = ProviderError::from_status("gemini", StatusCode::FORBIDDEN, "bad key");
        assert_eq!(err.kind, ProviderErrorKind::AuthError);
        assert!(!err.is_transient());
        assert!(!err.to_string().contains("[retryable]"));
    }

    #[test]
    fn timeout_without_status_uses_kind_label() {
        let err = ProviderError::new("gemini", ProviderErrorKind::Timeout, "request timed out");
        assert_eq!(err.to_string(), "gemini api error (timeout) [retryable]: request timed out");
    }
}
