//! Error types for Parley
//!
//! This module defines all error types used throughout the orchestrator.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Coarse classification of a failed provider HTTP exchange.
///
/// Derived from the status code alone so callers can branch without
/// string-matching the raw body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 401: Invalid API key or authentication failure
    Auth,
    /// 402: Payment required or billing issue
    Billing,
    /// 404: Model not found or endpoint not available
    ModelNotFound,
    /// 429: Rate limit or quota exceeded
    RateLimit,
    /// 400: Bad request, invalid JSON, malformed parameters
    InvalidRequest,
    /// 5xx: Server-side errors
    ServerError,
    /// Anything else
    Unknown,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderErrorKind::Auth => "Authentication error",
            ProviderErrorKind::Billing => "Billing error",
            ProviderErrorKind::ModelNotFound => "Model not found",
            ProviderErrorKind::RateLimit => "Rate limit error",
            ProviderErrorKind::InvalidRequest => "Invalid request",
            ProviderErrorKind::ServerError => "Server error",
            ProviderErrorKind::Unknown => "Unknown provider error",
        };
        f.write_str(label)
    }
}

/// A non-success response from a provider API, carrying the raw body.
#[derive(Debug, Clone)]
pub struct ProviderRequestError {
    /// Adapter name ("openai", "anthropic", ...)
    pub provider: String,
    /// HTTP status code
    pub status: u16,
    /// Raw response body as returned by the provider
    pub body: String,
}

impl ProviderRequestError {
    pub fn new(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Classify this error by HTTP status.
    pub fn kind(&self) -> ProviderErrorKind {
        match self.status {
            400 => ProviderErrorKind::InvalidRequest,
            401 => ProviderErrorKind::Auth,
            402 => ProviderErrorKind::Billing,
            404 => ProviderErrorKind::ModelNotFound,
            429 => ProviderErrorKind::RateLimit,
            500..=599 => ProviderErrorKind::ServerError,
            _ => ProviderErrorKind::Unknown,
        }
    }
}

impl fmt::Display for ProviderRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} (HTTP {}): {}",
            self.kind(),
            self.provider,
            self.status,
            self.body
        )
    }
}

impl From<ProviderRequestError> for ParleyError {
    fn from(err: ProviderRequestError) -> Self {
        ParleyError::ProviderRequest(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for Parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Missing or invalid provider credentials, unknown provider keys,
    /// duplicate function names and similar construction-time problems.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model asked for a function the agent does not have.
    #[error("Function {0} not found")]
    FunctionNotFound(String),

    /// Required function parameters missing or argument JSON unreadable.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Delegation target does not exist in the agency.
    #[error("Agent {0} not found")]
    AgentNotFound(String),

    /// A delegation function was invoked without an agency to resolve peers in.
    #[error("Agency not set")]
    AgencyNotSet,

    /// A supervisor agency was asked to chat before a supervisor was attached.
    #[error("No supervisor set")]
    SupervisorNotSet,

    /// Transport-level failure reported by a provider API.
    #[error("Provider request failed: {0}")]
    ProviderRequest(ProviderRequestError),

    /// Malformed or undecodable provider payloads, broken streams.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Delegation chain went deeper than the configured bound.
    #[error("Delegation depth exceeded: depth {depth} reached limit {max}")]
    DelegationDepthExceeded { depth: usize, max: usize },

    /// Operation not supported by this adapter yet.
    #[error("{0}")]
    NotImplemented(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for Parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ParleyError::Config("OpenAI API key not configured".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: OpenAI API key not configured"
        );
    }

    #[test]
    fn test_lookup_errors_mention_the_name() {
        assert_eq!(
            ParleyError::FunctionNotFound("weather".into()).to_string(),
            "Function weather not found"
        );
        assert_eq!(
            ParleyError::AgentNotFound("Ghost".into()).to_string(),
            "Agent Ghost not found"
        );
        assert_eq!(ParleyError::SupervisorNotSet.to_string(), "No supervisor set");
    }

    #[test]
    fn test_provider_request_kind_by_status() {
        let cases = [
            (400, ProviderErrorKind::InvalidRequest),
            (401, ProviderErrorKind::Auth),
            (402, ProviderErrorKind::Billing),
            (404, ProviderErrorKind::ModelNotFound),
            (429, ProviderErrorKind::RateLimit),
            (500, ProviderErrorKind::ServerError),
            (503, ProviderErrorKind::ServerError),
            (418, ProviderErrorKind::Unknown),
        ];
        for (status, kind) in cases {
            assert_eq!(ProviderRequestError::new("openai", status, "").kind(), kind);
        }
    }

    #[test]
    fn test_provider_request_keeps_raw_body() {
        let body = r#"{"error":{"message":"bad model"}}"#;
        let err: ParleyError = ProviderRequestError::new("openai", 400, body).into();
        let msg = err.to_string();
        assert!(msg.contains("HTTP 400"));
        assert!(msg.contains("bad model"));
        match err {
            ParleyError::ProviderRequest(inner) => assert_eq!(inner.body, body),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_depth_exceeded_display() {
        let err = ParleyError::DelegationDepthExceeded { depth: 4, max: 4 };
        assert!(err.to_string().contains("limit 4"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ParleyError = json_err.into();
        assert!(matches!(err, ParleyError::Json(_)));
    }
}
