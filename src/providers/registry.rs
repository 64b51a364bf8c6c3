//! Provider registry and resolution helpers.
//!
//! This module centralizes provider metadata and the mapping from configuration
//! to adapter instances. Adapters are built lazily, one per provider kind, and
//! cached until their key changes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, ProviderConfig};
use crate::error::{ParleyError, Result};

use super::anthropic::AnthropicAdapter;
use super::google::GoogleAdapter;
use super::openai::OpenAIAdapter;
use super::ProviderAdapter;

/// The closed set of provider wire styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Google,
}

/// Metadata describing a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSpec {
    /// Which adapter this row describes.
    pub kind: ProviderKind,
    /// Config key / provider id (e.g. "openai").
    pub name: &'static str,
    /// Name used in user-facing messages.
    pub display_name: &'static str,
    /// Conventional environment variable holding the API key.
    pub env_key: &'static str,
}

/// Provider registry in declaration order.
pub const PROVIDER_REGISTRY: &[ProviderSpec] = &[
    ProviderSpec {
        kind: ProviderKind::OpenAi,
        name: "openai",
        display_name: "OpenAI",
        env_key: "OPENAI_API_KEY",
    },
    ProviderSpec {
        kind: ProviderKind::Anthropic,
        name: "anthropic",
        display_name: "Anthropic",
        env_key: "ANTHROPIC_API_KEY",
    },
    ProviderSpec {
        kind: ProviderKind::Google,
        name: "google",
        display_name: "Google",
        env_key: "GOOGLE_API_KEY",
    },
];

impl ProviderKind {
    /// Registry row for this kind.
    pub fn spec(self) -> &'static ProviderSpec {
        PROVIDER_REGISTRY
            .iter()
            .find(|spec| spec.kind == self)
            .unwrap_or(&PROVIDER_REGISTRY[0])
    }

    /// Config key / provider id.
    pub fn as_str(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ParleyError;

    /// Parse a provider key, case-insensitively.
    ///
    /// # Example
    /// ```
    /// use parley::providers::ProviderKind;
    ///
    /// assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    /// assert!("mistral".parse::<ProviderKind>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        PROVIDER_REGISTRY
            .iter()
            .find(|spec| spec.name == key)
            .map(|spec| spec.kind)
            .ok_or_else(|| ParleyError::Config(format!("Unknown provider: {}", s)))
    }
}

/// Build a fresh adapter for `kind` from its provider configuration.
fn build_adapter(
    kind: ProviderKind,
    provider: &ProviderConfig,
) -> Result<Arc<dyn ProviderAdapter>> {
    let api_key = provider.api_key.as_deref().unwrap_or_default();
    let adapter: Arc<dyn ProviderAdapter> = match (kind, provider.api_base.as_deref()) {
        (ProviderKind::OpenAi, Some(base)) => {
            Arc::new(OpenAIAdapter::with_base_url(api_key, base)?)
        }
        (ProviderKind::OpenAi, None) => Arc::new(OpenAIAdapter::new(api_key)?),
        (ProviderKind::Anthropic, Some(base)) => {
            Arc::new(AnthropicAdapter::with_base_url(api_key, base)?)
        }
        (ProviderKind::Anthropic, None) => Arc::new(AnthropicAdapter::new(api_key)?),
        (ProviderKind::Google, _) => Arc::new(GoogleAdapter::new(api_key)?),
    };
    Ok(adapter)
}

/// Lookup table from provider kind to adapter instance.
///
/// Built once from a [`Config`] by the host application and shared by
/// reference with agent and agency constructors.
pub struct ProviderRegistry {
    config: Config,
    adapters: Mutex<HashMap<ProviderKind, Arc<dyn ProviderAdapter>>>,
}

impl ProviderRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            adapters: Mutex::new(HashMap::new()),
        }
    }

    /// The configuration this registry resolves against.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adapter for `kind`, constructing and caching it on first use.
    ///
    /// Fails with `"<Provider> API key not configured"` when no key is set.
    ///
    /// # Example
    /// ```
    /// use parley::config::Config;
    /// use parley::providers::{ProviderKind, ProviderRegistry};
    ///
    /// let registry = ProviderRegistry::new(Config::default());
    /// let err = registry.get(ProviderKind::Anthropic).err().unwrap();
    /// assert_eq!(err.to_string(), "Configuration error: Anthropic API key not configured");
    /// ```
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderAdapter>> {
        let mut adapters = self.adapters.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(adapter) = adapters.get(&kind) {
            return Ok(Arc::clone(adapter));
        }

        let provider = self
            .config
            .provider(kind)
            .filter(|p| p.api_key.is_some())
            .ok_or_else(|| {
                ParleyError::Config(format!(
                    "{} API key not configured",
                    kind.spec().display_name
                ))
            })?;
        let adapter = build_adapter(kind, provider)?;
        info!(provider = %kind, "Initialized provider adapter");
        adapters.insert(kind, Arc::clone(&adapter));
        Ok(adapter)
    }

    /// Adapter for the configured default provider.
    pub fn default_adapter(&self) -> Result<Arc<dyn ProviderAdapter>> {
        self.get(self.config.default_provider)
    }

    /// Configured default model, else the default adapter's own default.
    pub fn default_model(&self) -> Result<String> {
        match &self.config.default_model {
            Some(model) => Ok(model.clone()),
            None => Ok(self.default_adapter()?.default_model().to_string()),
        }
    }

    /// Replace the API key for `kind` and drop its cached adapter.
    pub fn set_api_key(&mut self, kind: ProviderKind, api_key: &str) {
        self.config.provider_mut(kind).api_key = Some(api_key.to_string());
        self.adapters
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&kind);
    }

    /// Install a ready-made adapter for `kind`, bypassing key lookup.
    pub fn register(&self, kind: ProviderKind, adapter: Arc<dyn ProviderAdapter>) {
        info!(provider = %kind, adapter = %adapter.name(), "Registering provider adapter");
        self.adapters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, adapter);
    }

    /// Provider kinds that currently have an API key configured.
    pub fn configured(&self) -> Vec<ProviderKind> {
        PROVIDER_REGISTRY
            .iter()
            .filter(|spec| {
                self.config
                    .provider(spec.kind)
                    .and_then(|p| p.api_key.as_deref())
                    .is_some_and(|k| !k.is_empty())
            })
            .map(|spec| spec.kind)
            .collect()
    }
}
