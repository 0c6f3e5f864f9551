use serde::{Deserialize, Serialize};

use crate::domain::provider::ProviderKind;

/// How strictly a session's credentials are scoped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// A user key source may fall back to the platform key
    #[default]
    Standard,
    /// Credentials come only from the declared key source
    Strict,
}

/// Where the credential for a session's provider calls comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeySource {
    /// Lab-owned demo key configured for the provider
    #[default]
    Platform,
    /// A key the user stored in the vault
    User { key_id: String },
}

/// Per-session provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub provider: ProviderKind,
    #[serde(default)]
    pub isolation_level: IsolationLevel,
    #[serde(default)]
    pub key_source: KeySource,
    /// Model used when a call does not name one
    #[serde(default)]
    pub default_model: Option<String>,
}

impl SessionConfig {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            isolation_level: IsolationLevel::default(),
            key_source: KeySource::default(),
            default_model: None,
        }
    }

    pub fn with_isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn with_key_source(mut self, source: KeySource) -> Self {
        self.key_source = source;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }
}
