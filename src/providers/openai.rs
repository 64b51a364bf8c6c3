//! OpenAI Provider Adapter
//!
//! Implements `ProviderAdapter` for OpenAI's Chat Completions API using the
//! `functions` / `function_call` calling convention: a function call arrives as
//! an inline `function_call` field whose arguments are a JSON string, and the
//! result goes back as a `function` role message carrying the function name.
//!
//! # Example
//!
//! ```rust,ignore
//! use parley::providers::{openai::OpenAIAdapter, ChatRequest, ProviderAdapter};
//! use parley::session::Message;
//!
//! async fn example() {
//!     let adapter = OpenAIAdapter::new("your-api-key").unwrap();
//!     let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("Hello!")]);
//!     let reply = adapter.chat(request).await.unwrap();
//!     println!("OpenAI: {}", reply.text());
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{ParleyError, Result};
use crate::session::{FunctionCall, Message, Role};

use super::sse::{self, Feed, StreamAssembler};
use super::types::merge_fragment;
use super::{ensure_success, http_client, require_api_key};
use super::{ChatRequest, FunctionSchema, ProviderAdapter, StreamEvent};

/// The OpenAI API endpoint URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// The default OpenAI model to use.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ============================================================================
// OpenAI API Request Types
// ============================================================================

/// OpenAI API request body (tool fragment merged in separately).
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    /// Model identifier
    model: String,
    /// Conversation messages (including system)
    messages: Vec<OpenAIMessage>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// A message in OpenAI's format.
#[derive(Debug, Serialize)]
struct OpenAIMessage {
    /// Role: "system", "user", "assistant", or "function"
    role: String,
    /// Message content (null for assistant function calls)
    content: Option<String>,
    /// Function name, set on function results
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Function call made by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<OpenAIFunctionCall>,
}

/// Function call details.
#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    /// Name of the function to call
    name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    arguments: String,
}

// ============================================================================
// OpenAI API Response Types
// ============================================================================

/// OpenAI API response body.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    /// Response choices
    choices: Vec<OpenAIChoice>,
}

/// A choice in the response.
#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    /// The message content
    message: OpenAIResponseMessage,
}

/// A message in the response.
#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    /// Text content (null when a function call is present)
    content: Option<String>,
    /// Function call requested by the model
    function_call: Option<OpenAIFunctionCall>,
}

/// One streamed chunk.
#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: Option<OpenAIDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<OpenAIFunctionCallDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunctionCallDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

// ============================================================================
// OpenAI Adapter
// ============================================================================

/// OpenAI-style provider adapter.
pub struct OpenAIAdapter {
    /// API key for authentication
    api_key: String,
    /// API base URL
    api_base: String,
    /// HTTP client for making requests
    client: Client,
}

impl OpenAIAdapter {
    /// Create a new OpenAI adapter with the given API key.
    ///
    /// Fails with a configuration error if the key is empty.
    ///
    /// # Example
    /// ```
    /// use parley::providers::openai::OpenAIAdapter;
    /// use parley::providers::ProviderAdapter;
    ///
    /// let adapter = OpenAIAdapter::new("sk-xxx").unwrap();
    /// assert_eq!(adapter.name(), "openai");
    /// assert!(OpenAIAdapter::new("").is_err());
    /// ```
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, OPENAI_API_URL)
    }

    /// Create a new OpenAI adapter with a custom base URL.
    ///
    /// Useful for OpenAI-compatible APIs (Azure, local models, etc.).
    /// A trailing slash is removed.
    pub fn with_base_url(api_key: &str, api_base: &str) -> Result<Self> {
        Self::with_client(api_key, api_base, http_client())
    }

    /// Create a new OpenAI adapter with a custom HTTP client.
    pub fn with_client(api_key: &str, api_base: &str, client: Client) -> Result<Self> {
        require_api_key(api_key)?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_body(&self, request: ChatRequest, stream: bool) -> Result<Value> {
        let body = OpenAIRequest {
            model: request.model,
            messages: convert_messages(request.messages),
            stream: stream.then_some(true),
        };
        let mut body = serde_json::to_value(body)?;
        merge_fragment(&mut body, request.functions.as_ref());
        Ok(body)
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        ensure_success(self.name(), response).await
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert canonical messages to OpenAI API format.
fn convert_messages(messages: Vec<Message>) -> Vec<OpenAIMessage> {
    messages
        .into_iter()
        .map(|msg| OpenAIMessage {
            role: msg.role.to_string(),
            content: msg.content,
            name: if msg.role == Role::Function {
                msg.name
            } else {
                None
            },
            function_call: msg.function_call.map(|call| OpenAIFunctionCall {
                name: call.name,
                arguments: call.arguments,
            }),
        })
        .collect()
}

/// Convert an OpenAI API response to a canonical message.
fn convert_response(response: OpenAIResponse) -> Result<Message> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ParleyError::Provider("OpenAI response had no choices".to_string()))?;

    Ok(match choice.message.function_call {
        Some(call) => {
            Message::assistant_function_call(FunctionCall::new(&call.name, &call.arguments))
        }
        None => Message::assistant(choice.message.content.as_deref().unwrap_or("")),
    })
}

/// Accumulates one streamed OpenAI reply.
///
/// `delta.function_call` fragments are collected silently; only
/// `delta.content` is forwarded.
#[derive(Debug, Default)]
struct OpenAIStreamAssembler {
    content: String,
    function_name: Option<String>,
    function_arguments: String,
}

impl StreamAssembler for OpenAIStreamAssembler {
    fn feed(&mut self, data: &str) -> Result<Feed> {
        let chunk: OpenAIStreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable OpenAI stream chunk");
                return Ok(Feed::Continue);
            }
        };

        if let Some(error) = chunk.error {
            return Err(ParleyError::Provider(format!(
                "OpenAI stream error: {}",
                error
            )));
        }

        let Some(delta) = chunk.choices.into_iter().next().and_then(|c| c.delta) else {
            return Ok(Feed::Continue);
        };

        if let Some(call) = delta.function_call {
            if let Some(name) = call.name {
                self.function_name = Some(name);
            }
            if let Some(arguments) = call.arguments {
                self.function_arguments.push_str(&arguments);
            }
            return Ok(Feed::Continue);
        }

        match delta.content {
            Some(text) if !text.is_empty() => {
                self.content.push_str(&text);
                Ok(Feed::Text(text))
            }
            _ => Ok(Feed::Continue),
        }
    }

    fn finish(self) -> Result<Message> {
        Ok(match self.function_name {
            Some(name) => Message::assistant_function_call(FunctionCall::new(
                &name,
                &self.function_arguments,
            )),
            None => Message::assistant(&self.content),
        })
    }
}

// ============================================================================
// ProviderAdapter Implementation
// ============================================================================

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn chat(&self, request: ChatRequest) -> Result<Message> {
        let model = request.model.clone();
        let body = self.build_body(request, false)?;
        debug!(model = %model, body = %body, "OpenAI request");

        let response = self.send(&body).await?;
        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ParleyError::Provider(format!("Failed to parse OpenAI response: {}", e)))?;

        info!(model = %model, "OpenAI response received");
        convert_response(openai_response)
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        let model = request.model.clone();
        let body = self.build_body(request, true)?;
        debug!(model = %model, body = %body, "OpenAI streaming request");

        let response = self.send(&body).await?;
        Ok(sse::pump(response, OpenAIStreamAssembler::default()))
    }

    fn format_functions(&self, functions: &[FunctionSchema]) -> Result<Value> {
        Ok(json!({
            "functions": functions,
            "function_call": "auto",
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
