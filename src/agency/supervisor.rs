//! Supervisor agency
//!
//! A synthetic supervisor agent receives every conversation. Its system prompt
//! lists the other agents in the agency and its only function is
//! `delegate_to`, which routes sub-tasks to those agents by name.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::agent::{Agent, TerminationPolicy};
use crate::error::{ParleyError, Result};
use crate::functions::DelegateFunction;
use crate::providers::{ProviderAdapter, ProviderRegistry, TextSink};
use crate::session::{ChatInput, Message};

use super::{Agency, AgentRoster};

/// Default name of the supervisor agent.
pub const SUPERVISOR_NAME: &str = "Supervisor";

/// Default description of the supervisor agent.
pub const SUPERVISOR_DESCRIPTION: &str =
    "A supervisor agent that coordinates between specialized agents";

const SUPERVISOR_ROLE: &str = "\
You are a supervisor agent that coordinates between specialized agents.
Your role is to:
1. Understand the user's request
2. Choose the most appropriate agent to handle it
3. Delegate using the delegate_to function
4. Review the agent's response
5. Either return the response to the user or delegate to another agent

After receiving a response, you can either:
1. Return it to the user if it fully answers their request
2. Delegate to another agent if more work is needed
3. Add your own clarification or summary if needed";

/// How the supervisor agent is built.
///
/// Anything left unset is resolved from the [`ProviderRegistry`] passed to
/// [`SupervisorAgency::create`].
#[derive(Clone)]
pub struct SupervisorOptions {
    pub name: String,
    pub description: String,
    /// Appended to the role description in the system prompt
    pub custom_instructions: Option<String>,
    pub provider: Option<Arc<dyn ProviderAdapter>>,
    pub model: Option<String>,
    pub termination: Option<Arc<dyn TerminationPolicy>>,
    /// Overrides `max_delegation_depth` from the configuration
    pub max_delegation_depth: Option<usize>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            name: SUPERVISOR_NAME.to_string(),
            description: SUPERVISOR_DESCRIPTION.to_string(),
            custom_instructions: None,
            provider: None,
            model: None,
            termination: None,
            max_delegation_depth: None,
        }
    }
}

impl SupervisorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_custom_instructions(mut self, instructions: &str) -> Self {
        self.custom_instructions = Some(instructions.to_string());
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_termination(mut self, policy: Arc<dyn TerminationPolicy>) -> Self {
        self.termination = Some(policy);
        self
    }

    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = Some(depth);
        self
    }
}

/// Build the supervisor's system prompt.
///
/// Lists every agent except the supervisor itself as `- name: description`.
pub fn supervisor_system_message(
    supervisor: &str,
    agents: &[Arc<Agent>],
    custom_instructions: Option<&str>,
) -> String {
    let mut sections = vec![SUPERVISOR_ROLE.to_string()];
    if let Some(instructions) = custom_instructions.filter(|s| !s.trim().is_empty()) {
        sections.push(instructions.to_string());
    }

    let listing: Vec<String> = agents
        .iter()
        .filter(|agent| agent.name() != supervisor)
        .map(|agent| format!("- {}: {}", agent.name(), agent.description()))
        .collect();
    sections.push(format!("Available agents:\n{}", listing.join("\n")));
    sections.push("Always use the delegate_to function to work with other agents.".to_string());

    sections.join("\n\n")
}

/// Agency where a supervisor delegates to specialised peers.
///
/// # Example
/// ```rust,ignore
/// use std::sync::Arc;
/// use parley::agency::{Agency, SupervisorAgency, SupervisorOptions};
///
/// let agency = SupervisorAgency::create(
///     vec![Arc::new(researcher), Arc::new(writer)],
///     &registry,
///     SupervisorOptions::new().with_custom_instructions("Prefer the writer for prose."),
/// )?;
/// let history = agency.chat("Write a haiku about Rust".into(), None).await?;
/// ```
pub struct SupervisorAgency {
    roster: Arc<AgentRoster>,
    supervisor: Option<Arc<Agent>>,
}

impl SupervisorAgency {
    /// An agency with members but no supervisor. `chat` fails with
    /// `SupervisorNotSet` until one is created.
    pub fn new(agents: Vec<Arc<Agent>>) -> Result<Self> {
        Ok(Self {
            roster: Arc::new(AgentRoster::from_agents(agents)?),
            supervisor: None,
        })
    }

    /// Build the agency and its supervisor.
    ///
    /// The supervisor is registered in the roster after the peers so it can
    /// be found by name like any other member.
    pub fn create(
        agents: Vec<Arc<Agent>>,
        registry: &ProviderRegistry,
        options: SupervisorOptions,
    ) -> Result<Self> {
        let mut agency = Self::new(agents)?;

        let peers = agency.roster.agents();
        let system_message = supervisor_system_message(
            &options.name,
            &peers,
            options.custom_instructions.as_deref(),
        );
        let max_depth = options
            .max_delegation_depth
            .unwrap_or(registry.config().max_delegation_depth);

        let delegate =
            DelegateFunction::new(&options.name, Arc::downgrade(&agency.roster), max_depth);

        let mut builder = Agent::builder(&options.name)
            .description(&options.description)
            .system_message(&system_message)
            .function(delegate);
        if let Some(provider) = options.provider {
            builder = builder.provider(provider);
        }
        if let Some(model) = &options.model {
            builder = builder.model(model);
        }
        if let Some(policy) = options.termination {
            builder = builder.termination(policy);
        }

        let supervisor = Arc::new(builder.build_with(registry)?);
        agency.roster.add(Arc::clone(&supervisor))?;

        info!(
            supervisor = %supervisor.name(),
            agents = peers.len(),
            max_depth = max_depth,
            "Created supervisor agency"
        );

        agency.supervisor = Some(supervisor);
        Ok(agency)
    }

    pub fn supervisor(&self) -> Option<&Arc<Agent>> {
        self.supervisor.as_ref()
    }

    pub fn roster(&self) -> &Arc<AgentRoster> {
        &self.roster
    }
}

#[async_trait]
impl Agency for SupervisorAgency {
    async fn chat(
        &self,
        input: ChatInput,
        sink: Option<&mut TextSink<'_>>,
    ) -> Result<Vec<Message>> {
        let supervisor = self.supervisor.as_ref().ok_or(ParleyError::SupervisorNotSet)?;
        supervisor.chat_at_depth(input, sink, 0).await
    }

    fn find_agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.roster.find_agent(name)
    }

    fn agents(&self) -> Vec<Arc<Agent>> {
        self.roster.agents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::providers::{ChatRequest, FunctionSchema};
    use serde_json::{json, Value};

    struct Canned(&'static str);

    #[async_trait]
    impl ProviderAdapter for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn default_model(&self) -> &str {
            "canned-1"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<Message> {
            Ok(Message::assistant(self.0))
        }

        fn format_functions(&self, functions: &[FunctionSchema]) -> Result<Value> {
            Ok(json!({ "functions": functions }))
        }
    }

    fn peer(name: &str, description: &str) -> Arc<Agent> {
        Arc::new(
            Agent::builder(name)
                .description(description)
                .provider(Arc::new(Canned("done")))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_system_message_lists_peers_but_not_self() {
        let agents = vec![
            peer("Researcher", "Finds facts"),
            peer("Supervisor", "me"),
            peer("Writer", "Writes prose"),
        ];
        let prompt = supervisor_system_message("Supervisor", &agents, Some("Be brief."));
        assert!(prompt.starts_with("You are a supervisor agent"));
        assert!(prompt.contains("Be brief."));
        assert!(prompt.contains("Available agents:\n- Researcher: Finds facts\n- Writer: Writes prose"));
        assert!(!prompt.contains("- Supervisor:"));
        assert!(prompt.ends_with("Always use the delegate_to function to work with other agents."));
    }

    #[test]
    fn test_create_registers_supervisor() {
        let registry = ProviderRegistry::new(Config::default());
        let agency = SupervisorAgency::create(
            vec![peer("Writer", "Writes prose")],
            &registry,
            SupervisorOptions::new().with_provider(Arc::new(Canned("ok"))),
        )
        .unwrap();

        let supervisor = agency.find_agent("Supervisor").unwrap();
        assert_eq!(supervisor.description(), SUPERVISOR_DESCRIPTION);
        assert_eq!(supervisor.functions().names(), vec!["delegate_to"]);
        assert!(supervisor
            .system_message()
            .unwrap()
            .contains("- Writer: Writes prose"));
        assert_eq!(agency.agents().len(), 2);
    }

    #[test]
    fn test_create_rejects_name_clash_with_supervisor() {
        let registry = ProviderRegistry::new(Config::default());
        let result = SupervisorAgency::create(
            vec![peer("Supervisor", "impostor")],
            &registry,
            SupervisorOptions::new().with_provider(Arc::new(Canned("ok"))),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_chat_without_supervisor() {
        let agency = SupervisorAgency::new(vec![peer("Writer", "Writes prose")]).unwrap();
        let err = agency.chat("hi".into(), None).await.unwrap_err();
        assert!(matches!(err, ParleyError::SupervisorNotSet));
        assert_eq!(err.to_string(), "No supervisor set");
    }

    #[tokio::test]
    async fn test_chat_goes_through_supervisor() {
        let registry = ProviderRegistry::new(Config::default());
        let agency = SupervisorAgency::create(
            vec![peer("Writer", "Writes prose")],
            &registry,
            SupervisorOptions::new().with_provider(Arc::new(Canned("handled"))),
        )
        .unwrap();

        let history = agency
            .chat(vec!["first", "second"].into(), None)
            .await
            .unwrap();
        assert_eq!(history[1], Message::user("first"));
        assert_eq!(history[2], Message::user("second"));
        assert_eq!(history.last().unwrap().text(), "handled");
    }
}
