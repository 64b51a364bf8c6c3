//! Delegation function for supervisor agencies.
//!
//! `DelegateFunction` lets a supervising agent route a sub-task to a peer
//! agent by name. The peer runs a fresh one-shot conversation seeded with the
//! supervisor's instruction and its final message content is returned to the
//! supervisor's model.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::agency::AgentRoster;
use crate::config::DEFAULT_MAX_DELEGATION_DEPTH;
use crate::error::{ParleyError, Result};
use crate::session::Message;

use super::{CallContext, Function};

/// Name under which the delegation function is exposed to the model.
pub const DELEGATE_FUNCTION_NAME: &str = "delegate_to";

/// Function that hands a task to another agent in the same agency.
///
/// Holds a weak reference to the agency's roster so the supervisor (which is
/// itself a roster member) does not keep the roster alive.
pub struct DelegateFunction {
    supervisor: String,
    roster: Option<Weak<AgentRoster>>,
    max_depth: usize,
}

impl DelegateFunction {
    /// Create a delegation function bound to `supervisor` and `roster`.
    ///
    /// # Arguments
    /// * `supervisor` - Name of the agent that owns this function
    /// * `roster` - The agency's agent table
    /// * `max_depth` - Deepest delegation level a call may start from
    pub fn new(supervisor: &str, roster: Weak<AgentRoster>, max_depth: usize) -> Self {
        Self {
            supervisor: supervisor.to_string(),
            roster: Some(roster),
            max_depth,
        }
    }

    /// A delegation function with no agency. Every call fails with `AgencyNotSet`.
    pub fn unbound(supervisor: &str) -> Self {
        Self {
            supervisor: supervisor.to_string(),
            roster: None,
            max_depth: DEFAULT_MAX_DELEGATION_DEPTH,
        }
    }

    /// Bind (or rebind) the agency roster.
    pub fn set_roster(&mut self, roster: Weak<AgentRoster>) {
        self.roster = Some(roster);
    }

    /// Name of the owning supervisor.
    pub fn supervisor(&self) -> &str {
        &self.supervisor
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn roster(&self) -> Result<Arc<AgentRoster>> {
        self.roster
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(ParleyError::AgencyNotSet)
    }
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ParleyError::InvalidArguments(format!("{} must be a string", key)))
}

#[async_trait]
impl Function for DelegateFunction {
    fn name(&self) -> &str {
        DELEGATE_FUNCTION_NAME
    }

    fn description(&self) -> &str {
        "Delegate a task to a specialized agent"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_name": {
                    "type": "string",
                    "description": "The name of the agent to delegate to"
                },
                "message": {
                    "type": "string",
                    "description": "The instructions for the agent being delegated to"
                }
            },
            "required": ["agent_name", "message"]
        })
    }

    async fn perform(&self, args: Value, ctx: &CallContext) -> Result<Value> {
        let roster = self.roster()?;
        let agent_name = string_arg(&args, "agent_name")?;
        let message = string_arg(&args, "message")?;

        if agent_name == self.supervisor {
            return Ok(json!({"error": "Cannot delegate to self"}));
        }

        if ctx.depth >= self.max_depth {
            return Err(ParleyError::DelegationDepthExceeded {
                depth: ctx.depth,
                max: self.max_depth,
            });
        }

        let agent = roster
            .find_agent(agent_name)
            .ok_or_else(|| ParleyError::AgentNotFound(agent_name.to_string()))?;

        info!(
            supervisor = %self.supervisor,
            depth = ctx.depth + 1,
            "Delegating to {}: {}",
            agent_name,
            message
        );

        let history = agent
            .chat_at_depth(vec![Message::user(message)].into(), None, ctx.depth + 1)
            .await?;

        let response = history
            .last()
            .and_then(|m| m.content.clone())
            .filter(|text| !text.is_empty());

        Ok(json!({ "response": response }))
    }
}
