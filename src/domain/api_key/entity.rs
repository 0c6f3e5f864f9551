//! Stored provider key entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::provider::ProviderKind;

/// Identifier of a stored key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeyId(String);

impl ApiKeyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id, `key_` followed by a simple uuid
    pub fn generate() -> Self {
        Self(format!("key_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ApiKeyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ApiKeyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's credential for one provider.
///
/// The secret never leaves the process through serialization; callers only
/// see the fingerprint and the masked hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredApiKey {
    id: ApiKeyId,
    owner_id: String,
    provider: ProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing, default)]
    secret: String,
    fingerprint: String,
    hint: String,
    created_at: DateTime<Utc>,
}

impl StoredApiKey {
    pub fn new(
        id: ApiKeyId,
        owner_id: impl Into<String>,
        provider: ProviderKind,
        secret: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let secret = secret.into();

        Self {
            id,
            owner_id: owner_id.into(),
            provider,
            label: None,
            fingerprint: fingerprint(&secret),
            hint: mask_secret(&secret),
            secret,
            created_at,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// Hex SHA-256 of a secret
pub fn fingerprint(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Keep the first three and last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();

    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
