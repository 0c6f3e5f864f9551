//! Key vault
//!
//! Holds users' provider credentials plus the platform keys configured for the
//! lab, and resolves which secret a session's calls run with.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::LabError;
use crate::domain::api_key::{
    ApiKeyId, ApiKeyRepository, StoredApiKey, validate_api_key_label, validate_api_key_secret,
};
use crate::domain::provider::ProviderKind;
use crate::domain::session::{IsolationLevel, KeySource, SessionConfig};

#[derive(Debug, Clone)]
pub struct ApiKeyVault {
    repository: Arc<dyn ApiKeyRepository>,
    platform_keys: HashMap<ProviderKind, String>,
}

impl ApiKeyVault {
    pub fn new(repository: Arc<dyn ApiKeyRepository>) -> Self {
        Self {
            repository,
            platform_keys: HashMap::new(),
        }
    }

    /// Set the platform key for a provider; blank secrets are ignored
    pub fn with_platform_key(mut self, provider: ProviderKind, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.trim().is_empty() {
            self.platform_keys.insert(provider, secret);
        }
        self
    }

    pub fn with_platform_keys(self, keys: HashMap<ProviderKind, String>) -> Self {
        keys.into_iter()
            .fold(self, |vault, (provider, secret)| vault.with_platform_key(provider, secret))
    }

    pub fn has_platform_key(&self, provider: ProviderKind) -> bool {
        self.platform_keys.contains_key(&provider)
    }

    /// Validate and store a user's key
    pub async fn store(
        &self,
        owner_id: &str,
        provider: ProviderKind,
        secret: &str,
        label: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StoredApiKey, LabError> {
        if owner_id.trim().is_empty() {
            return Err(LabError::validation("Owner is required"));
        }

        validate_api_key_secret(secret).map_err(|e| LabError::validation(e.to_string()))?;

        let mut key = StoredApiKey::new(ApiKeyId::generate(), owner_id, provider, secret, now);
        if let Some(label) = label {
            validate_api_key_label(label).map_err(|e| LabError::validation(e.to_string()))?;
            key = key.with_label(label);
        }

        let stored = self.repository.create(key).await?;

        info!(
            key_id = %stored.id(),
            owner_id,
            provider = %provider,
            hint = stored.hint(),
            "API key stored"
        );

        Ok(stored)
    }

    /// A key owned by `owner_id`; foreign keys are reported as missing
    pub async fn retrieve(&self, owner_id: &str, key_id: &ApiKeyId) -> Result<StoredApiKey, LabError> {
        match self.repository.get(key_id).await? {
            Some(key) if key.is_owned_by(owner_id) => Ok(key),
            Some(_) => {
                warn!(key_id = %key_id, owner_id, "Rejected access to a key owned by another user");
                Err(LabError::api_key(format!("API key '{}' not found", key_id)))
            }
            None => Err(LabError::api_key(format!("API key '{}' not found", key_id))),
        }
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<StoredApiKey>, LabError> {
        self.repository.list_by_owner(owner_id).await
    }

    pub async fn revoke(&self, owner_id: &str, key_id: &ApiKeyId) -> Result<(), LabError> {
        self.retrieve(owner_id, key_id).await?;

        if !self.repository.delete(key_id).await? {
            return Err(LabError::api_key(format!("API key '{}' not found", key_id)));
        }

        info!(key_id = %key_id, owner_id, "API key revoked");
        Ok(())
    }

    pub fn platform_key(&self, provider: ProviderKind) -> Result<&str, LabError> {
        self.platform_keys
            .get(&provider)
            .map(String::as_str)
            .ok_or_else(|| {
                LabError::provider_unavailable(provider.as_str(), "No platform key configured")
            })
    }

    /// Secret a session's calls run with.
    ///
    /// A user key must exist, belong to the session owner and match the
    /// session provider. Under standard isolation a failing user key falls
    /// back to the platform key when one is configured; strict isolation
    /// never falls back.
    pub async fn resolve_credential(
        &self,
        owner_id: &str,
        config: &SessionConfig,
    ) -> Result<String, LabError> {
        let key_id = match &config.key_source {
            KeySource::Platform => return self.platform_key(config.provider).map(str::to_string),
            KeySource::User { key_id } => ApiKeyId::new(key_id.as_str()),
        };

        let error = match self.retrieve(owner_id, &key_id).await {
            Ok(key) if key.provider() == config.provider => return Ok(key.secret().to_string()),
            Ok(key) => LabError::api_key(format!(
                "API key '{}' is for {}, session uses {}",
                key_id,
                key.provider(),
                config.provider
            )),
            Err(e) => e,
        };

        match config.isolation_level {
            IsolationLevel::Standard if self.has_platform_key(config.provider) => {
                debug!(
                    key_id = %key_id,
                    provider = %config.provider,
                    "User key unusable, falling back to platform key"
                );
                self.platform_key(config.provider).map(str::to_string)
            }
            _ => Err(error),
        }
    }
}
