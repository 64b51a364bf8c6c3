//! Provider adapter types
//!
//! The `ProviderAdapter` trait is the seam between the conversation engine and
//! one vendor's wire format. Besides the request/response round trip it exposes
//! the four function-call primitives the engine needs to stay provider-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{ParleyError, Result};
use crate::session::Message;

/// Callback that receives incremental text fragments.
pub type TextSink<'a> = dyn FnMut(&str) + Send + 'a;

/// Provider-neutral declaration of a callable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Function name, unique per agent
    pub name: String,
    /// Human/model readable description
    pub description: String,
    /// JSON Schema of the parameters object
    pub parameters: Value,
}

impl FunctionSchema {
    /// Create a schema. A parameter schema without `"type"` is treated as an object.
    ///
    /// # Example
    /// ```
    /// use parley::providers::FunctionSchema;
    /// use serde_json::json;
    ///
    /// let schema = FunctionSchema::new("lookup", "Look something up", json!({
    ///     "properties": {"query": {"type": "string"}},
    ///     "required": ["query"]
    /// }));
    /// assert_eq!(schema.parameters["type"], "object");
    /// ```
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        let mut parameters = if parameters.is_null() {
            Value::Object(Default::default())
        } else {
            parameters
        };
        if let Value::Object(map) = &mut parameters {
            map.entry("type")
                .or_insert_with(|| Value::String("object".to_string()));
        }
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Names listed in the schema's `required` array.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// A provider-agnostic chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Full conversation, system message included
    pub messages: Vec<Message>,
    /// Tool-declaration fragment produced by `ProviderAdapter::format_functions`
    pub functions: Option<Value>,
}

impl ChatRequest {
    pub fn new(model: &str, messages: Vec<Message>) -> Self {
        Self {
            model: model.to_string(),
            messages,
            functions: None,
        }
    }

    /// Attach a tool-declaration fragment.
    pub fn with_functions(mut self, fragment: Value) -> Self {
        self.functions = Some(fragment);
        self
    }
}

/// Events emitted by a streaming chat.
#[derive(Debug)]
pub enum StreamEvent {
    /// A plain text fragment
    Delta(String),
    /// The stream finished; carries the fully assembled message
    Done(Message),
    /// The stream failed
    Error(ParleyError),
}

/// Translation layer between canonical messages and one vendor's API.
///
/// The function-call primitives have canonical default implementations;
/// adapters override them only when their messages need extra handling.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short adapter name used in logs and errors ("openai", "anthropic", ...).
    fn name(&self) -> &str;

    /// Model used when neither the agent nor the configuration names one.
    fn default_model(&self) -> &str;

    /// Single blocking round trip.
    async fn chat(&self, request: ChatRequest) -> Result<Message>;

    /// Streaming round trip.
    ///
    /// Text fragments arrive as `Delta` events; function-call fragments are
    /// assembled inside the adapter and surface only in the final `Done`.
    /// The default implementation falls back to `chat`.
    async fn stream_chat(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        let message = self.chat(request).await?;
        let (tx, rx) = mpsc::channel(2);
        if message.function_call.is_none() {
            if let Some(text) = message.content.as_ref().filter(|t| !t.is_empty()) {
                let _ = tx.send(StreamEvent::Delta(text.clone())).await;
            }
        }
        let _ = tx.send(StreamEvent::Done(message)).await;
        Ok(rx)
    }

    /// Produce the request fragment declaring the callable functions.
    fn format_functions(&self, functions: &[FunctionSchema]) -> Result<Value>;

    /// Whether `message` asks for a function call.
    fn is_function_call(&self, message: &Message) -> bool {
        message.function_call.is_some()
    }

    /// Name of the requested function.
    fn function_name(&self, message: &Message) -> Result<String> {
        message
            .function_call
            .as_ref()
            .map(|call| call.name.clone())
            .ok_or_else(|| ParleyError::Provider("message has no function call".to_string()))
    }

    /// Parsed arguments of the requested function.
    fn function_arguments(&self, message: &Message) -> Result<Value> {
        match &message.function_call {
            Some(call) => call.parse_arguments(),
            None => Err(ParleyError::Provider(
                "message has no function call".to_string(),
            )),
        }
    }

    /// Build the message that reports `result` back to the model.
    fn format_function_response(&self, message: &Message, result: &Value) -> Message {
        let (name, id) = match &message.function_call {
            Some(call) => (call.name.as_str(), call.id.clone()),
            None => ("", None),
        };
        Message::function_result(name, &result.to_string(), id)
    }
}

/// Drain a stream, forwarding every text fragment to `sink`.
///
/// Returns the assembled final message. A stream that closes without a
/// `Done` event is an error.
pub async fn drain_stream(
    mut rx: mpsc::Receiver<StreamEvent>,
    mut sink: Option<&mut TextSink<'_>>,
) -> Result<Message> {
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Delta(text) => {
                if let Some(sink) = sink.as_deref_mut() {
                    sink(&text);
                }
            }
            StreamEvent::Done(message) => return Ok(message),
            StreamEvent::Error(e) => return Err(e),
        }
    }
    Err(ParleyError::Provider(
        "stream ended before completion".to_string(),
    ))
}

/// Merge the keys of a tool-declaration fragment into a serialized request body.
pub(crate) fn merge_fragment(body: &mut Value, fragment: Option<&Value>) {
    if let (Value::Object(target), Some(Value::Object(extra))) = (body, fragment) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
}
