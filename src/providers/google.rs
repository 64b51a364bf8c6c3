//! Google provider adapter (placeholder)
//!
//! Validates its key and reports a default model so configuration and agent
//! construction work, but every network operation returns
//! [`ParleyError::NotImplemented`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ParleyError, Result};
use crate::session::Message;

use super::require_api_key;
use super::{ChatRequest, FunctionSchema, ProviderAdapter};

const DEFAULT_MODEL: &str = "gemini-pro";

const NOT_IMPLEMENTED: &str = "Google provider not yet implemented";

/// Google-style provider adapter.
#[derive(Debug)]
pub struct GoogleAdapter {
    #[allow(dead_code)]
    api_key: String,
}

impl GoogleAdapter {
    pub fn new(api_key: &str) -> Result<Self> {
        require_api_key(api_key)?;
        Ok(Self {
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &str {
        "google"
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn chat(&self, _request: ChatRequest) -> Result<Message> {
        Err(ParleyError::NotImplemented(NOT_IMPLEMENTED.to_string()))
    }

    async fn stream_chat(
        &self,
        _request: ChatRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<super::StreamEvent>> {
        Err(ParleyError::NotImplemented(NOT_IMPLEMENTED.to_string()))
    }

    fn format_functions(&self, _functions: &[FunctionSchema]) -> Result<Value> {
        Err(ParleyError::NotImplemented(NOT_IMPLEMENTED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_adapter_requires_key() {
        assert!(GoogleAdapter::new("").is_err());
        let adapter = GoogleAdapter::new("g-key").unwrap();
        assert_eq!(adapter.default_model(), "gemini-pro");
    }

    #[tokio::test]
    async fn test_google_adapter_operations_not_implemented() {
        let adapter = GoogleAdapter::new("g-key").unwrap();
        let err = adapter
            .chat(ChatRequest::new("gemini-pro", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Google provider not yet implemented");
        assert!(adapter.stream_chat(ChatRequest::new("m", vec![])).await.is_err());
        assert!(adapter.format_functions(&[]).is_err());
    }
}
