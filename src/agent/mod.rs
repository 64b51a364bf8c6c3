//! Agent module - the conversation engine
//!
//! An agent owns a system prompt, a provider adapter, a function registry and
//! a termination policy, and runs the turn loop that exchanges messages with
//! the provider and executes requested functions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐
//! │   Caller    │────>│    Agent    │────>│ ProviderAdapter │
//! │ (or Agency) │     │  turn loop  │     │ (OpenAI, ...)   │
//! └─────────────┘     └─────────────┘     └─────────────────┘
//!                            │
//!                 ┌──────────┴──────────┐
//!                 ▼                     ▼
//!          ┌─────────────┐     ┌──────────────────┐
//!          │ Termination │     │ FunctionRegistry │
//!          │   Policy    │     │ (delegate_to...) │
//!          └─────────────┘     └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use parley::agent::Agent;
//! use parley::config::Config;
//! use parley::providers::ProviderRegistry;
//!
//! async fn run() -> parley::Result<()> {
//!     let registry = ProviderRegistry::new(Config::load()?);
//!     let agent = Agent::builder("Helper")
//!         .system_message("You are a helpful assistant.")
//!         .build_with(&registry)?;
//!
//!     let history = agent.chat("Hello!", None).await?;
//!     println!("{}", history.last().map(|m| m.text()).unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod termination;

pub use engine::{Agent, AgentBuilder};
pub use termination::{MaxMessages, TerminationPolicy, Timeout, DEFAULT_TIMEOUT};
