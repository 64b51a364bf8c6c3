//! Workflow agency: agents run one after another.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::error::Result;
use crate::providers::TextSink;
use crate::session::{ChatInput, Message};

use super::{Agency, AgentRoster};

/// Fixed pipeline of agents.
///
/// Each agent receives the full history returned by the previous one. Only
/// the last agent streams to the caller's sink; earlier agents run without
/// one and their partial output is discarded.
pub struct WorkflowAgency {
    roster: AgentRoster,
}

impl WorkflowAgency {
    pub fn new(agents: Vec<Arc<Agent>>) -> Result<Self> {
        Ok(Self {
            roster: AgentRoster::from_agents(agents)?,
        })
    }
}

#[async_trait]
impl Agency for WorkflowAgency {
    async fn chat(
        &self,
        input: ChatInput,
        mut sink: Option<&mut TextSink<'_>>,
    ) -> Result<Vec<Message>> {
        let agents = self.roster.agents();
        let mut messages = input.into_messages();
        if agents.is_empty() {
            return Ok(messages);
        }

        info!(steps = agents.len(), "Running workflow");

        let last = agents.len() - 1;
        for (index, agent) in agents.iter().enumerate() {
            debug!(agent = %agent.name(), step = index + 1, "Workflow step");
            let step_sink = if index == last {
                sink.as_deref_mut()
            } else {
                None
            };
            messages = agent.chat(messages, step_sink).await?;
        }

        Ok(messages)
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

    #[tokio::test]
    async fn test_empty_workflow_returns_input() {
        let agency = WorkflowAgency::new(Vec::new()).unwrap();
        let history = agency.chat("X".into(), None).await.unwrap();
        assert_eq!(history, vec![Message::user("X")]);
        assert!(agency.find_agent("anyone").is_none());
    }
}
