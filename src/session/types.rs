//! Message types for Parley
//!
//! This module defines the canonical message shape shared by agents, agencies
//! and provider adapters, including roles and function calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ParleyError, Result};

/// A single message in a conversation.
///
/// Ordering is significant: the full sequence is sent to the provider on every
/// turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// Text content; `None` for pure function-call replies
    #[serde(default)]
    pub content: Option<String>,
    /// Function call requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Name of the function this message is a result of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ID of the call this result answers, when the provider assigned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            function_call: None,
            name: None,
            tool_call_id: None,
        }
    }

    /// Create a new user message.
    ///
    /// # Example
    /// ```
    /// use parley::session::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: &str) -> Self {
        Self::with_role(Role::User, Some(content.to_string()))
    }

    /// Create a new assistant message.
    pub fn assistant(content: &str) -> Self {
        Self::with_role(Role::Assistant, Some(content.to_string()))
    }

    /// Create a new system message.
    ///
    /// # Example
    /// ```
    /// use parley::session::{Message, Role};
    ///
    /// let msg = Message::system("You are a helpful assistant.");
    /// assert_eq!(msg.role, Role::System);
    /// ```
    pub fn system(content: &str) -> Self {
        Self::with_role(Role::System, Some(content.to_string()))
    }

    /// Create an assistant message that requests a function call.
    ///
    /// # Example
    /// ```
    /// use parley::session::{FunctionCall, Message};
    ///
    /// let call = FunctionCall::new("get_weather", r#"{"city":"Oslo"}"#);
    /// let msg = Message::assistant_function_call(call);
    /// assert!(msg.content.is_none());
    /// assert_eq!(msg.function_call.unwrap().name, "get_weather");
    /// ```
    pub fn assistant_function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::with_role(Role::Assistant, None)
        }
    }

    /// Create a function result message.
    ///
    /// # Arguments
    /// * `name` - The function that produced the result
    /// * `content` - JSON-serialized result
    /// * `tool_call_id` - ID of the originating call, if the provider assigned one
    pub fn function_result(name: &str, content: &str, tool_call_id: Option<String>) -> Self {
        Self {
            name: Some(name.to_string()),
            tool_call_id,
            ..Self::with_role(Role::Function, Some(content.to_string()))
        }
    }

    /// Text content, or an empty string when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Check if this message carries a function call.
    pub fn has_function_call(&self) -> bool {
        self.function_call.is_some()
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompts and instructions
    System,
    /// Messages from the user
    User,
    /// Messages from the AI assistant
    Assistant,
    /// Results of function calls
    Function,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Function => write!(f, "function"),
        }
    }
}

/// A function call requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Provider-assigned call identifier (Anthropic `tool_use.id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the function to call
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

impl FunctionCall {
    /// Create a new function call without a provider id.
    pub fn new(name: &str, arguments: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    /// Attach a provider-assigned id.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Parse the arguments as a JSON value.
    ///
    /// Empty argument text is treated as an empty object.
    ///
    /// # Example
    /// ```
    /// use parley::session::FunctionCall;
    ///
    /// let call = FunctionCall::new("search", r#"{"query": "rust"}"#);
    /// assert_eq!(call.parse_arguments().unwrap()["query"], "rust");
    /// assert!(FunctionCall::new("noop", "").parse_arguments().unwrap().is_object());
    /// ```
    pub fn parse_arguments(&self) -> Result<Value> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.arguments).map_err(|e| {
            ParleyError::InvalidArguments(format!(
                "arguments for {} are not valid JSON: {}",
                self.name, e
            ))
        })
    }
}

/// Caller input to `chat`: a bare string or an existing history.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    /// A single user utterance
    Text(String),
    /// A prepared message sequence
    Messages(Vec<Message>),
}

impl ChatInput {
    /// Normalize into a message sequence. Bare text becomes one user message.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            ChatInput::Text(text) => vec![Message::user(&text)],
            ChatInput::Messages(messages) => messages,
        }
    }
}

impl From<&str> for ChatInput {
    fn from(text: &str) -> Self {
        ChatInput::Text(text.to_string())
    }
}

impl From<String> for ChatInput {
    fn from(text: String) -> Self {
        ChatInput::Text(text)
    }
}

impl From<Message> for ChatInput {
    fn from(message: Message) -> Self {
        ChatInput::Messages(vec![message])
    }
}

impl From<Vec<Message>> for ChatInput {
    fn from(messages: Vec<Message>) -> Self {
        ChatInput::Messages(messages)
    }
}

impl From<&[Message]> for ChatInput {
    fn from(messages: &[Message]) -> Self {
        ChatInput::Messages(messages.to_vec())
    }
}

/// Each string becomes a user message.
impl From<Vec<String>> for ChatInput {
    fn from(texts: Vec<String>) -> Self {
        ChatInput::Messages(texts.iter().map(|t| Message::user(t)).collect())
    }
}

impl From<Vec<&str>> for ChatInput {
    fn from(texts: Vec<&str>) -> Self {
        ChatInput::Messages(texts.into_iter().map(Message::user).collect())
    }
}
