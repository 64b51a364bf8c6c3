//! Configuration management for Parley
//!
//! Configuration is an explicit value: the host builds a [`Config`] once
//! (usually via [`Config::load`]) and hands it to a
//! [`ProviderRegistry`](crate::providers::ProviderRegistry). Nothing here is
//! global. Values come from `~/.parley/config.json` with environment variable
//! overrides applied on top.

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::providers::{ProviderKind, PROVIDER_REGISTRY};

impl Config {
    /// Returns the Parley configuration directory path (~/.parley)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".parley")
    }

    /// Returns the path to the config file (~/.parley/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides from the process environment.
    ///
    /// - `PARLEY_PROVIDERS_<P>_API_KEY`, falling back to the conventional
    ///   `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` / `GOOGLE_API_KEY`
    /// - `PARLEY_PROVIDERS_<P>_API_BASE`
    /// - `PARLEY_DEFAULT_PROVIDER`, `PARLEY_DEFAULT_MODEL`
    /// - `PARLEY_MAX_DELEGATION_DEPTH`, `PARLEY_MAX_MESSAGES`
    /// - `PARLEY_LOG_LEVEL`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub(crate) fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for spec in PROVIDER_REGISTRY {
            let prefix = format!("PARLEY_PROVIDERS_{}", spec.name.to_ascii_uppercase());
            let api_key = lookup(&format!("{}_API_KEY", prefix))
                .or_else(|| match self.provider(spec.kind) {
                    // file-configured keys win over the conventional variables
                    Some(p) if p.api_key.is_some() => None,
                    _ => lookup(spec.env_key),
                });
            if let Some(val) = api_key {
                self.provider_mut(spec.kind).api_key = Some(val);
            }
            if let Some(val) = lookup(&format!("{}_API_BASE", prefix)) {
                self.provider_mut(spec.kind).api_base = Some(val);
            }
        }

        if let Some(val) = lookup("PARLEY_DEFAULT_PROVIDER") {
            match val.parse::<ProviderKind>() {
                Ok(kind) => self.default_provider = kind,
                Err(e) => tracing::warn!(value = %val, error = %e, "Ignoring PARLEY_DEFAULT_PROVIDER"),
            }
        }
        if let Some(val) = lookup("PARLEY_DEFAULT_MODEL") {
            self.default_model = if val.is_empty() { None } else { Some(val) };
        }
        if let Some(val) = lookup("PARLEY_MAX_DELEGATION_DEPTH") {
            if let Ok(v) = val.parse() {
                self.max_delegation_depth = v;
            }
        }
        if let Some(val) = lookup("PARLEY_MAX_MESSAGES") {
            if let Ok(v) = val.parse() {
                self.max_messages = v;
            }
        }
        if let Some(val) = lookup("PARLEY_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Provider configuration for `kind`, if present.
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        match kind {
            ProviderKind::OpenAi => self.providers.openai.as_ref(),
            ProviderKind::Anthropic => self.providers.anthropic.as_ref(),
            ProviderKind::Google => self.providers.google.as_ref(),
        }
    }

    /// Mutable provider configuration for `kind`, created on demand.
    pub fn provider_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        let slot = match kind {
            ProviderKind::OpenAi => &mut self.providers.openai,
            ProviderKind::Anthropic => &mut self.providers.anthropic,
            ProviderKind::Google => &mut self.providers.google,
        };
        slot.get_or_insert_with(ProviderConfig::default)
    }

    /// A copy safe to print: API keys are masked.
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        for slot in [
            &mut copy.providers.openai,
            &mut copy.providers.anthropic,
            &mut copy.providers.google,
        ] {
            if let Some(provider) = slot.as_mut() {
                if let Some(key) = provider.api_key.as_mut() {
                    *key = mask_key(key);
                }
            }
        }
        copy
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
