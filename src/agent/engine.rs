//! Conversation engine
//!
//! An [`Agent`] binds a system prompt, a provider adapter, a function set and
//! a termination policy, and drives one conversation per `chat` call:
//!
//! 1. normalise the input and inject the system message at position 0
//! 2. ask the termination policy whether another turn may begin
//! 3. send the history to the provider (streaming when a sink is given)
//! 4. append the reply; if it is a function call, run the function, append
//!    the result and loop back to 2

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::{ParleyError, Result};
use crate::functions::{CallContext, Function, FunctionRegistry};
use crate::providers::{
    drain_stream, ChatRequest, ProviderAdapter, ProviderRegistry, TextSink,
};
use crate::session::{ChatInput, Message, Role};

use super::termination::{MaxMessages, TerminationPolicy};

/// A configured conversation participant.
///
/// Configuration is fixed at construction. The only mutable state is the
/// chat-history snapshot of the most recent `chat` call.
pub struct Agent {
    name: String,
    description: String,
    system_message: Option<String>,
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    functions: FunctionRegistry,
    termination: Arc<dyn TerminationPolicy>,
    chat_history: Mutex<Vec<Message>>,
}

impl Agent {
    /// Start building an agent called `name`.
    pub fn builder(name: &str) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn ProviderAdapter> {
        &self.provider
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Messages seen by the most recent `chat` call: the seeded input plus
    /// every provider reply. Replaced at the start of each call.
    pub fn chat_history(&self) -> Vec<Message> {
        self.chat_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Run one conversation and return the full history.
    ///
    /// When `sink` is given the provider is called in streaming mode and every
    /// text fragment is forwarded to it as it arrives.
    ///
    /// # Example
    /// ```rust,ignore
    /// let history = agent.chat("What is 2 + 2?", None).await?;
    /// println!("{}", history.last().map(|m| m.text()).unwrap_or_default());
    ///
    /// let mut print = |fragment: &str| print!("{}", fragment);
    /// agent.chat("Tell me a story", Some(&mut print)).await?;
    /// ```
    pub async fn chat(
        &self,
        input: impl Into<ChatInput>,
        sink: Option<&mut TextSink<'_>>,
    ) -> Result<Vec<Message>> {
        self.chat_at_depth(input.into(), sink, 0).await
    }

    /// Run one conversation `depth` delegation hops below the caller.
    pub async fn chat_at_depth(
        &self,
        input: ChatInput,
        mut sink: Option<&mut TextSink<'_>>,
        depth: usize,
    ) -> Result<Vec<Message>> {
        let mut history = self.seed(input);
        self.replace_history(&history);

        let ctx = CallContext::new().with_agent(&self.name).with_depth(depth);
        let mut functions: Option<Value> = None;

        info!(
            agent = %self.name,
            provider = %self.provider.name(),
            model = %self.model,
            depth = depth,
            messages = history.len(),
            "Starting conversation"
        );

        let mut turn = 0usize;
        while self.termination.should_continue(&history) {
            turn += 1;
            debug!(agent = %self.name, turn = turn, "Starting turn");

            if turn == 1 {
                functions = self.function_fragment()?;
            }

            let mut request = ChatRequest::new(&self.model, history.clone());
            if let Some(fragment) = &functions {
                request = request.with_functions(fragment.clone());
            }
            debug!(
                agent = %self.name,
                provider = %self.provider.name(),
                request = ?request,
                "Calling provider"
            );

            let reply = self
                .dispatch(request, sink.as_deref_mut())
                .await
                .inspect_err(|e| {
                    error!(agent = %self.name, error = %e, "Provider call failed");
                })?;

            history.push(reply.clone());
            self.push_history(reply.clone());

            if !self.provider.is_function_call(&reply) {
                break;
            }

            let name = self.provider.function_name(&reply)?;
            let result = self.run_function(&name, &reply, &ctx).await?;

            if let Some(sink) = sink.as_deref_mut() {
                let raw = serde_json::to_string(&reply).unwrap_or_default();
                sink(&format!("\n[Function Call: {}]\n", raw));
                sink(&format!("{}\n", result));
            }

            history.push(self.provider.format_function_response(&reply, &result));
        }

        info!(
            agent = %self.name,
            turns = turn,
            messages = history.len(),
            "Conversation finished"
        );

        Ok(history)
    }

    /// Provider-specific declaration of this agent's functions, if it has any.
    fn function_fragment(&self) -> Result<Option<Value>> {
        if self.functions.is_empty() {
            return Ok(None);
        }
        self.provider
            .format_functions(&self.functions.schemas())
            .map(Some)
    }

    fn seed(&self, input: ChatInput) -> Vec<Message> {
        let mut messages = input.into_messages();
        if let Some(system) = &self.system_message {
            messages.retain(|m| m.role != Role::System);
            messages.insert(0, Message::system(system));
        }
        messages
    }

    async fn dispatch(
        &self,
        request: ChatRequest,
        sink: Option<&mut TextSink<'_>>,
    ) -> Result<Message> {
        match sink {
            Some(sink) => {
                let rx = self.provider.stream_chat(request).await?;
                drain_stream(rx, Some(sink)).await
            }
            None => self.provider.chat(request).await,
        }
    }

    /// Resolve and run the requested function.
    ///
    /// An unknown name aborts the conversation. Invalid arguments become a
    /// result the model can see and correct.
    async fn run_function(&self, name: &str, reply: &Message, ctx: &CallContext) -> Result<Value> {
        if !self.functions.has(name) {
            error!(agent = %self.name, function = %name, "Model requested unknown function");
            return Err(ParleyError::FunctionNotFound(name.to_string()));
        }

        info!(agent = %self.name, function = %name, "Executing function");

        let outcome = match self.provider.function_arguments(reply) {
            Ok(args) => self.functions.call(name, args, ctx).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => Ok(value),
            Err(e @ ParleyError::InvalidArguments(_)) => {
                warn!(agent = %self.name, function = %name, error = %e, "Rejected function arguments");
                Ok(json!({ "error": e.to_string() }))
            }
            Err(e) => Err(e),
        }
    }

    fn replace_history(&self, messages: &[Message]) {
        let mut history = self.chat_history.lock().unwrap_or_else(|e| e.into_inner());
        *history = messages.to_vec();
    }

    fn push_history(&self, message: Message) {
        self.chat_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("functions", &self.functions.names())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Agent`].
///
/// # Example
/// ```rust,ignore
/// use parley::agent::{Agent, MaxMessages};
///
/// let agent = Agent::builder("Researcher")
///     .description("Finds facts")
///     .system_message("You are a careful researcher.")
///     .termination(MaxMessages::new(20))
///     .build_with(&registry)?;
/// ```
pub struct AgentBuilder {
    name: String,
    description: String,
    system_message: Option<String>,
    provider: Option<Arc<dyn ProviderAdapter>>,
    model: Option<String>,
    functions: Vec<Arc<dyn Function>>,
    termination: Option<Arc<dyn TerminationPolicy>>,
}

impl AgentBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            system_message: None,
            provider: None,
            model: None,
            functions: Vec::new(),
            termination: None,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn system_message(mut self, system_message: &str) -> Self {
        self.system_message = Some(system_message.to_string());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn function(self, function: impl Function + 'static) -> Self {
        self.shared_function(Arc::new(function))
    }

    pub fn shared_function(mut self, function: Arc<dyn Function>) -> Self {
        self.functions.push(function);
        self
    }

    pub fn termination(mut self, policy: impl TerminationPolicy + 'static) -> Self {
        self.termination = Some(Arc::new(policy));
        self
    }

    /// Build with an explicitly supplied provider.
    ///
    /// The model defaults to the provider's own default and the termination
    /// policy to `MaxMessages(100)`.
    pub fn build(self) -> Result<Agent> {
        let provider = self.provider.clone().ok_or_else(|| {
            ParleyError::Config(format!("Agent {} has no provider", self.name))
        })?;
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        self.finish(provider, model, MaxMessages::default())
    }

    /// Build, resolving anything unset from the registry's configuration.
    ///
    /// Without an explicit provider the configured default provider and
    /// default model are used. The default termination policy takes its
    /// limit from `max_messages`.
    pub fn build_with(self, registry: &ProviderRegistry) -> Result<Agent> {
        let (provider, model) = match (self.provider.clone(), self.model.clone()) {
            (Some(provider), Some(model)) => (provider, model),
            (Some(provider), None) => {
                let model = provider.default_model().to_string();
                (provider, model)
            }
            (None, Some(model)) => (registry.default_adapter()?, model),
            (None, None) => (registry.default_adapter()?, registry.default_model()?),
        };
        let limit = MaxMessages::new(registry.config().max_messages);
        self.finish(provider, model, limit)
    }

    fn finish(
        self,
        provider: Arc<dyn ProviderAdapter>,
        model: String,
        default_termination: MaxMessages,
    ) -> Result<Agent> {
        let mut functions = FunctionRegistry::new();
        for function in self.functions {
            functions.register(function)?;
        }

        info!(
            agent = %self.name,
            provider = %provider.name(),
            model = %model,
            functions = functions.len(),
            "Built agent"
        );

        Ok(Agent {
            name: self.name,
            description: self.description,
            system_message: self.system_message,
            provider,
            model,
            functions,
            termination: self
                .termination
                .unwrap_or_else(|| Arc::new(default_termination)),
            chat_history: Mutex::new(Vec::new()),
        })
    }
}
