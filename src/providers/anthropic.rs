//! Anthropic provider adapter
//!
//! Implements `ProviderAdapter` for Anthropic's Messages API. Function calls
//! arrive as `tool_use` content blocks with native JSON input and results go
//! back as `tool_result` blocks inside a user message. System messages are
//! lifted out of the conversation into the top-level `system` field.
//!
//! # Example
//!
//! ```rust,ignore
//! use parley::providers::{anthropic::AnthropicAdapter, ChatRequest, ProviderAdapter};
//! use parley::session::Message;
//!
//! async fn example() {
//!     let adapter = AnthropicAdapter::new("your-api-key").unwrap();
//!     let request = ChatRequest::new(
//!         adapter.default_model(),
//!         vec![Message::system("Be brief."), Message::user("Hello!")],
//!     );
//!     let reply = adapter.chat(request).await.unwrap();
//!     println!("Claude: {}", reply.text());
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

/// The Anthropic API base URL.
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// The default Claude model to use.
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// The Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Completion budget sent with every request.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic-style provider adapter.
pub struct AnthropicAdapter {
    /// API key for authentication
    api_key: String,
    /// API base URL
    api_base: String,
    /// HTTP client for making requests
    client: Client,
}

impl AnthropicAdapter {
    /// Create a new Anthropic adapter with the given API key.
    ///
    /// # Example
    /// ```
    /// use parley::providers::anthropic::AnthropicAdapter;
    /// use parley::providers::ProviderAdapter;
    ///
    /// let adapter = AnthropicAdapter::new("sk-ant-api03-xxx").unwrap();
    /// assert_eq!(adapter.name(), "anthropic");
    /// assert_eq!(adapter.default_model(), "claude-3-5-sonnet-20241022");
    /// ```
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, ANTHROPIC_API_URL)
    }

    /// Create a new Anthropic adapter against a custom base URL.
    pub fn with_base_url(api_key: &str, api_base: &str) -> Result<Self> {
        Self::with_client(api_key, api_base, http_client())
    }

    /// Create a new Anthropic adapter with a custom HTTP client.
    pub fn with_client(api_key: &str, api_base: &str, client: Client) -> Result<Self> {
        require_api_key(api_key)?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_body(&self, request: ChatRequest, stream: bool) -> Result<Value> {
        let (system, messages) = convert_messages(request.messages);
        let body = AnthropicRequest {
            model: request.model,
            max_tokens: DEFAULT_MAX_TOKENS,
            messages,
            system,
            stream: stream.then_some(true),
        };
        let mut body = serde_json::to_value(body)?;
        merge_fragment(&mut body, request.functions.as_ref());
        Ok(body)
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;
        ensure_success(self.name(), response).await
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn chat(&self, request: ChatRequest) -> Result<Message> {
        let model = request.model.clone();
        let body = self.build_body(request, false)?;
        debug!(model = %model, body = %body, "Anthropic request");

        let response = self.send(&body).await?;
        let anthropic_response: AnthropicResponse = response.json().await.map_err(|e| {
            ParleyError::Provider(format!("Failed to parse Anthropic response: {}", e))
        })?;

        info!(model = %model, "Anthropic response received");
        Ok(convert_response(anthropic_response))
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        let model = request.model.clone();
        let body = self.build_body(request, true)?;
        debug!(model = %model, body = %body, "Anthropic streaming request");

        let response = self.send(&body).await?;
        Ok(sse::pump(response, AnthropicStreamAssembler::default()))
    }

    fn format_functions(&self, functions: &[FunctionSchema]) -> Result<Value> {
        let tools: Vec<AnthropicTool> = functions
            .iter()
            .map(|f| AnthropicTool {
                name: f.name.clone(),
                description: f.description.clone(),
                input_schema: f.parameters.clone(),
            })
            .collect();
        Ok(json!({ "tools": tools }))
    }
}

// ============================================================================
// Anthropic API Request Types
// ============================================================================

/// Anthropic API request body (tool fragment merged in separately).
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    /// Model identifier
    model: String,
    /// Maximum tokens to generate
    max_tokens: u32,
    /// Conversation messages (excluding system)
    messages: Vec<AnthropicMessage>,
    /// System prompt (separate from messages in the Anthropic API)
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// A message in Anthropic's format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicMessage {
    /// Role: "user" or "assistant"
    role: String,
    /// Message content (string or array of blocks)
    content: AnthropicContent,
}

/// Message content - simple text or content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AnthropicContent {
    /// Simple text content
    Text(String),
    /// Array of content blocks (for tool calls/results)
    Blocks(Vec<AnthropicContentBlock>),
}

/// A content block within a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
    /// Block types we do not consume (thinking, server tools, ...)
    #[serde(other, skip_serializing)]
    Unknown,
}

/// Anthropic tool definition.
#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

// ============================================================================
// Anthropic API Response Types
// ============================================================================

/// Anthropic API response body.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    /// Response content blocks
    content: Vec<AnthropicContentBlock>,
}

// ============================================================================
// Anthropic SSE Streaming Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SseEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<SseDelta>,
    #[serde(default)]
    content_block: Option<SseContentBlock>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    #[serde(rename = "type")]
    #[serde(default)]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn synthetic_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Convert canonical messages to Anthropic API format.
///
/// Returns the joined system prompt (if any) and the remaining messages.
/// Consecutive function results are grouped into one user message of
/// `tool_result` blocks. A result whose call id is unknown degrades to a
/// plain user text message.
fn convert_messages(messages: Vec<Message>) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system_parts: Vec<String> = Vec::new();
    let mut converted: Vec<AnthropicMessage> = Vec::new();
    let mut pending_results: Vec<AnthropicContentBlock> = Vec::new();
    // id handed to the most recent tool_use, for results that carry none
    let mut open_call_id: Option<String> = None;

    fn flush(pending: &mut Vec<AnthropicContentBlock>, out: &mut Vec<AnthropicMessage>) {
        if !pending.is_empty() {
            out.push(AnthropicMessage {
                role: "user".to_string(),
                content: AnthropicContent::Blocks(std::mem::take(pending)),
            });
        }
    }

    for msg in messages {
        match msg.role {
            Role::System => {
                if let Some(content) = msg.content {
                    system_parts.push(content);
                }
            }
            Role::User => {
                flush(&mut pending_results, &mut converted);
                converted.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: AnthropicContent::Text(msg.content.unwrap_or_default()),
                });
            }
            Role::Assistant => {
                flush(&mut pending_results, &mut converted);
                match msg.function_call {
                    Some(call) => {
                        let mut blocks = Vec::new();
                        if let Some(text) = msg.content.filter(|t| !t.is_empty()) {
                            blocks.push(AnthropicContentBlock::Text { text });
                        }
                        let id = call.id.clone().unwrap_or_else(synthetic_call_id);
                        open_call_id = Some(id.clone());
                        let input = call
                            .parse_arguments()
                            .unwrap_or_else(|_| Value::Object(Default::default()));
                        blocks.push(AnthropicContentBlock::ToolUse {
                            id,
                            name: call.name,
                            input,
                        });
                        converted.push(AnthropicMessage {
                            role: "assistant".to_string(),
                            content: AnthropicContent::Blocks(blocks),
                        });
                    }
                    None => converted.push(AnthropicMessage {
                        role: "assistant".to_string(),
                        content: AnthropicContent::Text(msg.content.unwrap_or_default()),
                    }),
                }
            }
            Role::Function => {
                let content = msg.content.unwrap_or_default();
                match msg.tool_call_id.or_else(|| open_call_id.take()) {
                    Some(tool_use_id) => {
                        pending_results.push(AnthropicContentBlock::ToolResult {
                            tool_use_id,
                            content,
                        });
                    }
                    None => {
                        flush(&mut pending_results, &mut converted);
                        converted.push(AnthropicMessage {
                            role: "user".to_string(),
                            content: AnthropicContent::Text(format!(
                                "Function result: {}",
                                content
                            )),
                        });
                    }
                }
            }
        }
    }
    flush(&mut pending_results, &mut converted);

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n"))
    };
    (system, converted)
}

/// Convert an Anthropic API response to a canonical message.
///
/// Text blocks are joined with newlines; the first `tool_use` block, if any,
/// becomes the message's function call.
fn convert_response(response: AnthropicResponse) -> Message {
    let mut text = String::new();
    let mut call: Option<FunctionCall> = None;

    for block in response.content {
        match block {
            AnthropicContentBlock::Text { text: t } => {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&t);
            }
            AnthropicContentBlock::ToolUse { id, name, input } => {
                if call.is_none() {
                    call = Some(FunctionCall::new(&name, &input.to_string()).with_id(&id));
                }
            }
            AnthropicContentBlock::ToolResult { .. } | AnthropicContentBlock::Unknown => {}
        }
    }

    match call {
        Some(call) => {
            let mut message = Message::assistant_function_call(call);
            if !text.is_empty() {
                message.content = Some(text);
            }
            message
        }
        None => Message::assistant(&text),
    }
}

/// Accumulates one streamed Anthropic reply.
#[derive(Debug, Default)]
struct AnthropicStreamAssembler {
    content: String,
    tool_id: Option<String>,
    tool_name: Option<String>,
    tool_json: String,
}

impl StreamAssembler for AnthropicStreamAssembler {
    fn feed(&mut self, data: &str) -> Result<Feed> {
        let event: SseEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable Anthropic stream event");
                return Ok(Feed::Continue);
            }
        };

        match event.event_type.as_str() {
            "content_block_start" => {
                if let Some(block) = event.content_block {
                    // only the first tool_use of a reply is kept
                    if block.block_type == "tool_use" && self.tool_name.is_none() {
                        self.tool_id = block.id;
                        self.tool_name = block.name;
                    }
                }
                Ok(Feed::Continue)
            }
            "content_block_delta" => {
                let Some(delta) = event.delta else {
                    return Ok(Feed::Continue);
                };
                match delta.delta_type.as_deref() {
                    Some("text_delta") => match delta.text {
                        Some(text) if !text.is_empty() => {
                            self.content.push_str(&text);
                            Ok(Feed::Text(text))
                        }
                        _ => Ok(Feed::Continue),
                    },
                    Some("input_json_delta") => {
                        if let Some(chunk) = delta.partial_json {
                            self.tool_json.push_str(&chunk);
                        }
                        Ok(Feed::Continue)
                    }
                    _ => Ok(Feed::Continue),
                }
            }
            "message_stop" => Ok(Feed::Stop),
            "error" => Err(ParleyError::Provider(format!(
                "Anthropic stream error: {}",
                event.error.unwrap_or(Value::Null)
            ))),
            _ => Ok(Feed::Continue),
        }
    }

    fn finish(self) -> Result<Message> {
        let Some(name) = self.tool_name else {
            return Ok(Message::assistant(&self.content));
        };

        let arguments = if self.tool_json.trim().is_empty() {
            "{}".to_string()
        } else {
            serde_json::from_str::<Value>(&self.tool_json).map_err(|e| {
                ParleyError::Provider(format!("Malformed tool input from Anthropic stream: {}", e))
            })?;
            self.tool_json
        };

        let mut call = FunctionCall::new(&name, &arguments);
        call.id = self.tool_id;
        let mut message = Message::assistant_function_call(call);
        if !self.content.is_empty() {
            message.content = Some(self.content);
        }
        Ok(message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> AnthropicAdapter {
        AnthropicAdapter::new("test-key").unwrap()
    }

    #[test]
    fn test_anthropic_adapter_creation() {
        let adapter = adapter();
        assert_eq!(adapter.name(), "anthropic");
        assert_eq!(adapter.api_base, "https://api.anthropic.com");
        assert!(AnthropicAdapter::new("").is_err());
    }

    #[test]
    fn test_system_messages_are_joined() {
        let (system, messages) = convert_messages(vec![
            Message::system("first"),
            Message::system("second"),
            Message::user("Hello"),
        ]);
        assert_eq!(system.as_deref(), Some("first\nsecond"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_function_round_trip_uses_tool_blocks() {
        let call = FunctionCall::new("lookup", r#"{"q":"rust"}"#).with_id("toolu_1");
        let (_, messages) = convert_messages(vec![
            Message::user("find rust"),
            Message::assistant_function_call(call),
            Message::function_result("lookup", "{\"hits\":3}", Some("toolu_1".into())),
        ]);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, "assistant");
        match &messages[1].content {
            AnthropicContent::Blocks(blocks) => match &blocks[0] {
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    assert_eq!(id, "toolu_1");
                    assert_eq!(name, "lookup");
                    assert_eq!(input["q"], "rust");
                }
                other => panic!("expected tool_use, got {other:?}"),
            },
            other => panic!("expected blocks, got {other:?}"),
        }
        assert_eq!(messages[2].role, "user");
        match &messages[2].content {
            AnthropicContent::Blocks(blocks) => match &blocks[0] {
                AnthropicContentBlock::ToolResult {
                    tool_use_id,
                    content,
                } => {
                    assert_eq!(tool_use_id, "toolu_1");
                    assert_eq!(content, "{\"hits\":3}");
                }
                other => panic!("expected tool_result, got {other:?}"),
            },
            other => panic!("expected blocks, got {other:?}"),
        }
    }

    #[test]
    fn test_call_without_id_gets_synthetic_id_shared_with_result() {
        let (_, messages) = convert_messages(vec![
            Message::assistant_function_call(FunctionCall::new("lookup", "{}")),
            Message::function_result("lookup", "1", None),
        ]);
        let json = serde_json::to_value(&messages).unwrap();
        let use_id = json[0]["content"][0]["id"].as_str().unwrap();
        assert!(use_id.starts_with("call_"));
        assert_eq!(json[1]["content"][0]["tool_use_id"], use_id);
    }

    #[test]
    fn test_orphan_function_result_becomes_text() {
        let (_, messages) =
            convert_messages(vec![Message::function_result("lookup", "42", None)]);
        let json = serde_json::to_value(&messages).unwrap();
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[0]["content"], "Function result: 42");
    }

    #[test]
    fn test_request_body_shape() {
        let adapter = adapter();
        let fragment = adapter
            .format_functions(&[FunctionSchema::new("lookup", "Look up", json!({}))])
            .unwrap();
        let request = ChatRequest::new(
            DEFAULT_MODEL,
            vec![Message::system("S"), Message::user("hi")],
        )
        .with_functions(fragment);

        let body = adapter.build_body(request, true).unwrap();
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], "S");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["tools"][0]["name"], "lookup");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_convert_response_text_blocks() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "First"},
                {"type": "text", "text": "Second"}
            ]
        }))
        .unwrap();
        let message = convert_response(response);
        assert_eq!(message.text(), "First\nSecond");
        assert!(!adapter().is_function_call(&message));
    }

    #[test]
    fn test_convert_response_tool_use() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_7", "name": "lookup", "input": {"q": "x"}}
            ]
        }))
        .unwrap();
        let message = convert_response(response);
        let adapter = adapter();
        assert!(adapter.is_function_call(&message));
        assert_eq!(adapter.function_name(&message).unwrap(), "lookup");
        assert_eq!(adapter.function_arguments(&message).unwrap(), json!({"q": "x"}));

        let result = adapter.format_function_response(&message, &json!({"ok": true}));
        assert_eq!(result.role, Role::Function);
        assert_eq!(result.name.as_deref(), Some("lookup"));
        assert_eq!(result.tool_call_id.as_deref(), Some("toolu_7"));
    }

    #[test]
    fn test_convert_response_skips_unknown_blocks() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "Working it out", "signature": "sig"},
                {"type": "text", "text": "Done"},
                {"type": "tool_use", "id": "toolu_8", "name": "lookup", "input": {}}
            ]
        }))
        .unwrap();
        let message = convert_response(response);
        assert_eq!(message.text(), "Done");
        assert_eq!(adapter().function_name(&message).unwrap(), "lookup");
    }

    #[test]
    fn test_stream_assembler_text() {
        let mut assembler = AnthropicStreamAssembler::default();
        assert_eq!(
            assembler
                .feed(r#"{"type":"message_start","message":{"usage":{"input_tokens":3}}}"#)
                .unwrap(),
            Feed::Continue
        );
        assert_eq!(
            assembler
                .feed(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#)
                .unwrap(),
            Feed::Text("Hi".to_string())
        );
        assert_eq!(
            assembler.feed(r#"{"type":"message_stop"}"#).unwrap(),
            Feed::Stop
        );
        assert_eq!(assembler.finish().unwrap().text(), "Hi");
    }

    #[test]
    fn test_stream_assembler_tool_use_is_silent() {
        let mut assembler = AnthropicStreamAssembler::default();
        let events = [
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"toolu_1","name":"lookup","input":{}}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"q\":"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"\"rust\"}"}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
        ];
        for event in events {
            assert_eq!(assembler.feed(event).unwrap(), Feed::Continue);
        }
        let message = assembler.finish().unwrap();
        let call = message.function_call.unwrap();
        assert_eq!(call.id.as_deref(), Some("toolu_1"));
        assert_eq!(call.name, "lookup");
        assert_eq!(call.arguments, r#"{"q":"rust"}"#);
    }

    #[test]
    fn test_stream_assembler_tool_use_without_input() {
        let mut assembler = AnthropicStreamAssembler::default();
        assembler
            .feed(r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"t","name":"ping"}}"#)
            .unwrap();
        let call = assembler.finish().unwrap().function_call.unwrap();
        assert_eq!(call.arguments, "{}");
    }

    #[test]
    fn test_stream_assembler_error_event() {
        let mut assembler = AnthropicStreamAssembler::default();
        let err = assembler
            .feed(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }
}
