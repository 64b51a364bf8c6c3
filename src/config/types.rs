//! Configuration type definitions for Parley
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a partial config file only needs the fields it changes.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderKind;

/// Default upper bound on the number of messages in one conversation.
pub const DEFAULT_MAX_MESSAGES: usize = 100;

/// Default bound on nested delegation calls.
pub const DEFAULT_MAX_DELEGATION_DEPTH: usize = 4;

/// Main configuration struct for Parley
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider credentials and endpoints
    pub providers: ProvidersConfig,
    /// Provider used by agents that do not name one
    pub default_provider: ProviderKind,
    /// Model used by agents that do not name one; `None` means the adapter's default
    pub default_model: Option<String>,
    /// How many delegation hops a supervisor chain may take
    pub max_delegation_depth: usize,
    /// Message limit of the default termination policy
    pub max_messages: usize,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            default_provider: ProviderKind::OpenAi,
            default_model: None,
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
            max_messages: DEFAULT_MAX_MESSAGES,
            logging: LoggingConfig::default(),
        }
    }
}

// ============================================================================
// Provider Configurations
// ============================================================================

/// All LLM provider configurations
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    /// OpenAI configuration
    pub openai: Option<ProviderConfig>,
    /// Anthropic configuration
    pub anthropic: Option<ProviderConfig>,
    /// Google configuration
    pub google: Option<ProviderConfig>,
}

/// Generic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,
    /// Custom API base URL
    #[serde(default)]
    pub api_base: Option<String>,
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// Compact single-line output
    #[default]
    Component,
    /// JSON lines for log aggregators
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Level filter used when `RUST_LOG` is unset
    pub level: String,
    /// Append logs to this file instead of stderr
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            file: None,
        }
    }
}
