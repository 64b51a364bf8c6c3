//! Parley - multi-agent LLM conversation orchestrator
//!
//! Agents wrap a provider adapter, a system prompt and a set of callable
//! functions; agencies compose agents into supervisor (delegation) or
//! workflow (pipeline) topologies.

pub mod agency;
pub mod agent;
pub mod config;
pub mod error;
pub mod functions;
pub mod providers;
pub mod session;
pub mod utils;

pub use agency::{Agency, AgentRoster, SupervisorAgency, SupervisorOptions, WorkflowAgency};
pub use agent::{Agent, AgentBuilder, MaxMessages, TerminationPolicy, Timeout};
pub use config::Config;
pub use error::{ParleyError, ProviderRequestError, Result};
pub use functions::{CallContext, DelegateFunction, FnFunction, Function, FunctionRegistry};
pub use providers::{ProviderAdapter, ProviderKind, ProviderRegistry, StreamEvent};
pub use session::{ChatInput, FunctionCall, Message, Role};
