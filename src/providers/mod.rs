//! Providers module - LLM provider adapters (OpenAI, Anthropic, Google)
//!
//! This module defines the `ProviderAdapter` trait and the common request and
//! streaming types. Each adapter translates canonical messages into one
//! vendor's wire format and back, so the conversation engine is written once.
//!
//! # Example
//!
//! ```rust,ignore
//! use parley::config::Config;
//! use parley::providers::{ChatRequest, ProviderKind, ProviderRegistry};
//! use parley::session::Message;
//!
//! async fn example() {
//!     let registry = ProviderRegistry::new(Config::load().unwrap());
//!     let adapter = registry.get(ProviderKind::Anthropic).unwrap();
//!     let request = ChatRequest::new(adapter.default_model(), vec![Message::user("Hello!")]);
//!     let reply = adapter.chat(request).await.unwrap();
//!     println!("Response: {}", reply.text());
//! }
//! ```

pub mod anthropic;
pub mod google;
pub mod openai;
mod registry;
mod sse;
mod types;

use std::time::Duration;

use reqwest::Client;
use tracing::error;

use crate::error::{ParleyError, ProviderRequestError, Result};

pub use anthropic::AnthropicAdapter;
pub use google::GoogleAdapter;
pub use openai::OpenAIAdapter;
pub use registry::{ProviderKind, ProviderRegistry, ProviderSpec, PROVIDER_REGISTRY};
pub use types::{
    drain_stream, ChatRequest, FunctionSchema, ProviderAdapter, StreamEvent, TextSink,
};

/// Request timeout for provider HTTP calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client shared by adapter constructors.
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Reject empty credentials at adapter construction.
pub(crate) fn require_api_key(api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(ParleyError::Config("API key is required".to_string()));
    }
    Ok(())
}

/// Parse an HTTP status code and response body into a [`ProviderRequestError`].
///
/// Centralizes the mapping so every adapter reports failures the same way.
pub fn parse_provider_error(provider: &str, status: u16, body: &str) -> ProviderRequestError {
    ProviderRequestError::new(provider, status, body)
}

/// Pass successful responses through; log and convert everything else.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(
        provider = %provider,
        status = status.as_u16(),
        body = %body,
        "Provider request failed"
    );
    Err(parse_provider_error(provider, status.as_u16(), &body).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    #[test]
    fn test_parse_provider_error_401() {
        let err = parse_provider_error("openai", 401, "invalid api key");
        assert_eq!(err.kind(), ProviderErrorKind::Auth);
        assert_eq!(err.status, 401);
    }

    #[test]
    fn test_parse_provider_error_429() {
        let err = parse_provider_error("anthropic", 429, "rate limited");
        assert_eq!(err.kind(), ProviderErrorKind::RateLimit);
        assert_eq!(err.provider, "anthropic");
    }

    #[test]
    fn test_parse_provider_error_unknown_keeps_body() {
        let err = parse_provider_error("openai", 418, "teapot");
        assert_eq!(err.kind(), ProviderErrorKind::Unknown);
        assert!(err.to_string().contains("HTTP 418"));
        assert!(err.to_string().contains("teapot"));
    }

    #[test]
    fn test_require_api_key() {
        assert!(require_api_key("sk-1").is_ok());
        assert!(require_api_key("").is_err());
        assert!(require_api_key("   ").is_err());
    }
}
