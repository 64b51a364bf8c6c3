//! Agency module - compositions of agents
//!
//! An agency owns a roster of agents and decides how a conversation flows
//! between them:
//!
//! - [`SupervisorAgency`]: a synthetic supervisor agent receives the
//!   conversation and routes sub-tasks to peers with `delegate_to`.
//! - [`WorkflowAgency`]: agents run in a fixed sequence, each receiving the
//!   previous agent's full history.

pub mod supervisor;
pub mod workflow;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::agent::Agent;
use crate::error::{ParleyError, Result};
use crate::providers::TextSink;
use crate::session::{ChatInput, Message};

pub use supervisor::{SupervisorAgency, SupervisorOptions, SUPERVISOR_NAME};
pub use workflow::WorkflowAgency;

/// A composition strategy over a set of agents.
#[async_trait]
pub trait Agency: Send + Sync {
    /// Run a conversation through the agency and return the final history.
    async fn chat(
        &self,
        input: ChatInput,
        sink: Option<&mut TextSink<'_>>,
    ) -> Result<Vec<Message>>;

    /// Look up a member by exact name.
    fn find_agent(&self, name: &str) -> Option<Arc<Agent>>;

    /// All members, in registration order.
    fn agents(&self) -> Vec<Arc<Agent>>;
}

/// Name-unique table of the agents in one agency.
///
/// Shared between the agency and the delegation function of its supervisor.
#[derive(Debug, Default)]
pub struct AgentRoster {
    agents: RwLock<Vec<Arc<Agent>>>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster, rejecting duplicate names.
    pub fn from_agents(agents: impl IntoIterator<Item = Arc<Agent>>) -> Result<Self> {
        let roster = Self::new();
        for agent in agents {
            roster.add(agent)?;
        }
        Ok(roster)
    }

    /// Add an agent. Names must be unique within the roster.
    pub fn add(&self, agent: Arc<Agent>) -> Result<()> {
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        if agents.iter().any(|a| a.name() == agent.name()) {
            return Err(ParleyError::Config(format!(
                "Agent {} is already registered",
                agent.name()
            )));
        }
        agents.push(agent);
        Ok(())
    }

    /// Agent with exactly this name.
    pub fn find_agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|agent| agent.name() == name)
            .cloned()
    }

    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.agents.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatRequest, FunctionSchema, ProviderAdapter};
    use serde_json::Value;

    struct Silent;

    #[async_trait]
    impl ProviderAdapter for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn default_model(&self) -> &str {
            "silent-1"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<Message> {
            Ok(Message::assistant(""))
        }

        fn format_functions(&self, _functions: &[FunctionSchema]) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn agent(name: &str) -> Arc<Agent> {
        Arc::new(
            Agent::builder(name)
                .provider(Arc::new(Silent))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_roster_lookup_is_exact() {
        let roster = AgentRoster::from_agents([agent("Writer"), agent("Editor")]).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.find_agent("Writer").unwrap().name(), "Writer");
        assert!(roster.find_agent("writer").is_none());
        assert!(roster.find_agent("Ghost").is_none());
    }

    #[test]
    fn test_roster_rejects_duplicate_names() {
        let err = AgentRoster::from_agents([agent("Writer"), agent("Writer")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Agent Writer is already registered"
        );
    }

    #[test]
    fn test_roster_keeps_order() {
        let roster = AgentRoster::new();
        assert!(roster.is_empty());
        roster.add(agent("B")).unwrap();
        roster.add(agent("A")).unwrap();
        let names: Vec<String> = roster.agents().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
