//! End-to-end tests for Parley
//!
//! These tests exercise agents and agencies in a manner closer to production
//! usage, combining the conversation engine, function registry, delegation and
//! agency composition rather than testing individual units in isolation.
//!
//! All providers are in-process mocks; no network access is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use parley::agency::{Agency, AgentRoster, SupervisorAgency, SupervisorOptions, WorkflowAgency};
use parley::agent::{Agent, MaxMessages};
use parley::config::Config;
use parley::error::{ParleyError, Result};
use parley::functions::{CallContext, DelegateFunction, FnFunction, Function};
use parley::providers::{ChatRequest, FunctionSchema, ProviderAdapter, ProviderRegistry};
use parley::session::{FunctionCall, Message, Role};

// ============================================================================
// Mock Providers for E2E Tests
// ============================================================================

type Responder = dyn Fn(&ChatRequest) -> Message + Send + Sync;

/// A provider whose reply is computed from the request by a closure.
/// Counts invocations so tests can assert on network usage.
struct MockProvider {
    name: String,
    calls: AtomicUsize,
    respond: Box<Responder>,
}

impl MockProvider {
    fn new<F>(name: &str, respond: F) -> Arc<Self>
    where
        F: Fn(&ChatRequest) -> Message + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    /// Always answers with the same text.
    fn fixed(name: &str, text: &'static str) -> Arc<Self> {
        Self::new(name, move |_| Message::assistant(text))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn chat(&self, request: ChatRequest) -> Result<Message> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.respond)(&request))
    }

    fn format_functions(&self, functions: &[FunctionSchema]) -> Result<Value> {
        Ok(json!({ "functions": functions, "function_call": "auto" }))
    }
}

fn delegate_call(agent_name: &str, message: &str) -> Message {
    let args = json!({ "agent_name": agent_name, "message": message }).to_string();
    Message::assistant_function_call(FunctionCall::new("delegate_to", &args))
}

/// Supervisor script: delegate once, then echo the function result back.
fn supervisor_provider(target: &'static str, instruction: &'static str) -> Arc<MockProvider> {
    MockProvider::new("mock-supervisor", move |request| {
        match request.messages.last() {
            Some(last) if last.role == Role::Function => {
                Message::assistant(&format!("Result: {}", last.text()))
            }
            _ => delegate_call(target, instruction),
        }
    })
}

fn peer(name: &str, description: &str, provider: Arc<MockProvider>) -> Arc<Agent> {
    Arc::new(
        Agent::builder(name)
            .description(description)
            .provider(provider)
            .build()
            .unwrap(),
    )
}

fn function_result(history: &[Message]) -> Value {
    let message = history
        .iter()
        .find(|m| m.role == Role::Function)
        .expect("no function result in history");
    serde_json::from_str(message.text()).unwrap()
}

// ============================================================================
// Single agent
// ============================================================================

#[tokio::test]
async fn e2e_system_prompt_conversation() {
    let provider = MockProvider::fixed("mock", "ok");
    let agent = Agent::builder("Helper")
        .system_message("S")
        .provider(provider.clone())
        .build()
        .unwrap();

    let history = agent.chat("hi", None).await.unwrap();

    assert_eq!(
        history,
        vec![Message::system("S"), Message::user("hi"), Message::assistant("ok")]
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn e2e_history_at_limit_makes_no_provider_call() {
    let provider = MockProvider::fixed("mock", "never");
    let agent = Agent::builder("Limited")
        .provider(provider.clone())
        .termination(MaxMessages::new(3))
        .build()
        .unwrap();

    let input = vec![
        Message::user("a"),
        Message::assistant("b"),
        Message::user("c"),
    ];
    let history = agent.chat(input.clone(), None).await.unwrap();

    assert_eq!(history, input);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn e2e_missing_required_argument_never_runs_handler() {
    let spy_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&spy_calls);
    let spy = FnFunction::new(
        "book_flight",
        "Book a flight",
        json!({
            "properties": {"from": {"type": "string"}, "to": {"type": "string"}},
            "required": ["from", "to"]
        }),
        move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"booked": true}))
            }
        },
    );

    let provider = MockProvider::new("mock", |request| match request.messages.last() {
        Some(last) if last.role == Role::Function => Message::assistant("sorry"),
        _ => Message::assistant_function_call(FunctionCall::new(
            "book_flight",
            r#"{"from": "OSL"}"#,
        )),
    });
    let agent = Agent::builder("Travel")
        .provider(provider.clone())
        .function(spy)
        .build()
        .unwrap();

    let history = agent.chat("book me a flight", None).await.unwrap();

    assert_eq!(spy_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        function_result(&history),
        json!({"error": "Invalid arguments: missing keyword: to"})
    );
    assert_eq!(history.last().unwrap().text(), "sorry");
    assert_eq!(provider.calls(), 2);
}

// ============================================================================
// Workflow agency
// ============================================================================

#[tokio::test]
async fn e2e_workflow_pipes_history_and_streams_last_agent_only() {
    let a = MockProvider::fixed("mock-a", "draft from A");
    let b = MockProvider::new("mock-b", |request| {
        // B sees A's reply as part of its input
        let seen = request
            .messages
            .iter()
            .any(|m| m.text() == "draft from A");
        Message::assistant(if seen { "polished by B" } else { "B saw nothing" })
    });
    let agency = WorkflowAgency::new(vec![
        peer("A", "drafts", a.clone()),
        peer("B", "polishes", b.clone()),
    ])
    .unwrap();

    let mut fragments = Vec::new();
    let mut sink = |s: &str| fragments.push(s.to_string());
    let history = agency.chat("X".into(), Some(&mut sink)).await.unwrap();

    assert_eq!(
        history,
        vec![
            Message::user("X"),
            Message::assistant("draft from A"),
            Message::assistant("polished by B"),
        ]
    );
    assert_eq!(fragments.concat(), "polished by B");
    assert!(fragments.iter().all(|f| !f.contains("draft from A")));
    assert_eq!((a.calls(), b.calls()), (1, 1));
}

#[tokio::test]
async fn e2e_workflow_find_agent() {
    let agency = WorkflowAgency::new(vec![
        peer("A", "first", MockProvider::fixed("m", "a")),
        peer("B", "second", MockProvider::fixed("m", "b")),
    ])
    .unwrap();
    assert_eq!(agency.find_agent("B").unwrap().description(), "second");
    assert!(agency.find_agent("C").is_none());
}

// ============================================================================
// Supervisor agency
// ============================================================================

fn registry() -> ProviderRegistry {
    ProviderRegistry::new(Config::default())
}

#[tokio::test]
async fn e2e_supervisor_delegates_to_peer() {
    let writer_provider = MockProvider::new("mock-writer", |request| {
        let instruction = request.messages.last().map(|m| m.text().to_string());
        Message::assistant(&format!("haiku about {}", instruction.unwrap_or_default()))
    });
    let writer = peer("Writer", "Writes poems", writer_provider.clone());

    let agency = SupervisorAgency::create(
        vec![writer],
        &registry(),
        SupervisorOptions::new().with_provider(supervisor_provider("Writer", "rust")),
    )
    .unwrap();

    let history = agency.chat("Write a haiku".into(), None).await.unwrap();

    assert_eq!(history[0].role, Role::System);
    assert!(history[0].text().contains("- Writer: Writes poems"));
    assert_eq!(function_result(&history), json!({"response": "haiku about rust"}));
    assert_eq!(
        history.last().unwrap().text(),
        r#"Result: {"response":"haiku about rust"}"#
    );
    assert_eq!(writer_provider.calls(), 1);

    // the peer ran a fresh one-shot conversation
    let writer = agency.find_agent("Writer").unwrap();
    assert_eq!(
        writer.chat_history(),
        vec![Message::user("rust"), Message::assistant("haiku about rust")]
    );
}

#[tokio::test]
async fn e2e_supervisor_self_delegation_is_model_visible() {
    let peer_provider = MockProvider::fixed("mock-peer", "unused");
    let agency = SupervisorAgency::create(
        vec![peer("Writer", "Writes poems", peer_provider.clone())],
        &registry(),
        SupervisorOptions::new().with_provider(supervisor_provider("Supervisor", "loop")),
    )
    .unwrap();

    let history = agency.chat("hi".into(), None).await.unwrap();

    assert_eq!(
        function_result(&history),
        json!({"error": "Cannot delegate to self"})
    );
    assert_eq!(peer_provider.calls(), 0);
}

#[tokio::test]
async fn e2e_supervisor_delegation_to_unknown_agent_fails() {
    let agency = SupervisorAgency::create(
        vec![peer("Writer", "Writes poems", MockProvider::fixed("m", "x"))],
        &registry(),
        SupervisorOptions::new().with_provider(supervisor_provider("Ghost", "boo")),
    )
    .unwrap();

    let err = agency.chat("hi".into(), None).await.unwrap_err();

    assert!(matches!(err, ParleyError::AgentNotFound(ref name) if name == "Ghost"));
    assert!(err.to_string().contains("Ghost"));
}

#[tokio::test]
async fn e2e_peer_with_null_content_yields_null_response() {
    let silent = MockProvider::new("mock-silent", |_| Message {
        role: Role::Assistant,
        content: None,
        function_call: None,
        name: None,
        tool_call_id: None,
    });
    let agency = SupervisorAgency::create(
        vec![peer("Mute", "Says nothing", silent)],
        &registry(),
        SupervisorOptions::new().with_provider(supervisor_provider("Mute", "speak")),
    )
    .unwrap();

    let history = agency.chat("hi".into(), None).await.unwrap();
    assert_eq!(function_result(&history), json!({"response": null}));
}

#[tokio::test]
async fn e2e_delegate_returns_last_message_content() {
    // a peer whose termination policy stops immediately returns just the seed
    let idle = Arc::new(
        Agent::builder("Idle")
            .provider(MockProvider::fixed("m", "unused"))
            .termination(MaxMessages::new(0))
            .build()
            .unwrap(),
    );
    let roster = Arc::new(AgentRoster::from_agents([idle]).unwrap());
    let delegate = DelegateFunction::new("Boss", Arc::downgrade(&roster), 4);

    let out = delegate
        .call(
            json!({"agent_name": "Idle", "message": "anything"}),
            &CallContext::new(),
        )
        .await
        .unwrap();
    // the seed user message is the last message
    assert_eq!(out, json!({"response": "anything"}));

    let empty = Arc::new(
        Agent::builder("Empty")
            .provider(MockProvider::fixed("m", ""))
            .build()
            .unwrap(),
    );
    roster.add(empty).unwrap();
    let out = delegate
        .call(
            json!({"agent_name": "Empty", "message": "anything"}),
            &CallContext::new(),
        )
        .await
        .unwrap();
    assert_eq!(out, json!({"response": null}));
}

#[tokio::test]
async fn e2e_supervisor_streams_function_fragments() {
    let agency = SupervisorAgency::create(
        vec![peer("Writer", "Writes poems", MockProvider::fixed("m", "poem"))],
        &registry(),
        SupervisorOptions::new().with_provider(supervisor_provider("Writer", "go")),
    )
    .unwrap();

    let mut output = String::new();
    let mut sink = |s: &str| output.push_str(s);
    agency.chat("hi".into(), Some(&mut sink)).await.unwrap();

    assert!(output.contains("[Function Call: "));
    assert!(output.contains(r#"{"response":"poem"}"#));
    assert!(output.ends_with(r#"Result: {"response":"poem"}"#));
}

#[tokio::test]
async fn e2e_mutual_delegation_is_bounded() {
    let roster = Arc::new(AgentRoster::new());

    let ping = MockProvider::new("mock-ping", |_| delegate_call("Pong", "your turn"));
    let pong = MockProvider::new("mock-pong", |_| delegate_call("Ping", "your turn"));

    for (name, provider) in [("Ping", ping.clone()), ("Pong", pong.clone())] {
        let agent = Agent::builder(name)
            .provider(provider)
            .function(DelegateFunction::new(name, Arc::downgrade(&roster), 3))
            .build()
            .unwrap();
        roster.add(Arc::new(agent)).unwrap();
    }

    let ping_agent = roster.find_agent("Ping").unwrap();
    let err = ping_agent.chat("start", None).await.unwrap_err();

    assert!(matches!(
        err,
        ParleyError::DelegationDepthExceeded { depth: 3, max: 3 }
    ));
    assert_eq!(ping.calls() + pong.calls(), 4);
}

#[tokio::test]
async fn e2e_configured_depth_limits_supervisor() {
    let mut config = Config::default();
    config.max_delegation_depth = 0;
    let registry = ProviderRegistry::new(config);

    let agency = SupervisorAgency::create(
        vec![peer("Writer", "Writes poems", MockProvider::fixed("m", "poem"))],
        &registry,
        SupervisorOptions::new().with_provider(supervisor_provider("Writer", "go")),
    )
    .unwrap();

    let err = agency.chat("hi".into(), None).await.unwrap_err();
    assert!(matches!(err, ParleyError::DelegationDepthExceeded { .. }));
}
