//! In-memory stored key repository

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::LabError;
use crate::domain::api_key::{ApiKeyId, ApiKeyRepository, StoredApiKey};

#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: RwLock<HashMap<String, StoredApiKey>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn create(&self, key: StoredApiKey) -> Result<StoredApiKey, LabError> {
        let mut keys = self
            .keys
            .write()
            .map_err(|e| LabError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let id = key.id().as_str().to_string();
        if keys.contains_key(&id) {
            return Err(LabError::api_key(format!(
                "API key with ID '{}' already exists",
                id
            )));
        }

        keys.insert(id, key.clone());
        Ok(key)
    }

    async fn get(&self, id: &ApiKeyId) -> Result<Option<StoredApiKey>, LabError> {
        let keys = self
            .keys
            .read()
            .map_err(|e| LabError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(keys.get(id.as_str()).cloned())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<StoredApiKey>, LabError> {
        let keys = self
            .keys
            .read()
            .map_err(|e| LabError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut owned: Vec<StoredApiKey> = keys
            .values()
            .filter(|k| k.is_owned_by(owner_id))
            .cloned()
            .collect();

        owned.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });
        Ok(owned)
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, LabError> {
        let mut keys = self
            .keys
            .write()
            .map_err(|e| LabError::internal(format!("Failed to acquire write lock: {}", e)))?;

        Ok(keys.remove(id.as_str()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::ProviderKind;
    use chrono::{Duration, Utc};

    fn key(id: &str, owner: &str, offset_secs: i64) -> StoredApiKey {
        StoredApiKey::new(
            ApiKeyId::new(id),
            owner,
            ProviderKind::OpenAi,
            "sk-test-secret-value",
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryApiKeyRepository::new();
        repo.create(key("key_1", "alice", 0)).await.unwrap();

        let stored = repo.get(&ApiKeyId::new("key_1")).await.unwrap().unwrap();
        assert_eq!(stored.owner_id(), "alice");
        assert!(repo.get(&ApiKeyId::new("key_2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_id() {
        let repo = InMemoryApiKeyRepository::new();
        repo.create(key("key_1", "alice", 0)).await.unwrap();

        assert!(repo.create(key("key_1", "bob", 0)).await.is_err());
    }

    #[tokio::test]
    async fn test_list_by_owner_oldest_first() {
        let repo = InMemoryApiKeyRepository::new();
        repo.create(key("key_new", "alice", 10)).await.unwrap();
        repo.create(key("key_bob", "bob", 0)).await.unwrap();
        repo.create(key("key_old", "alice", 0)).await.unwrap();

        let ids: Vec<_> = repo
            .list_by_owner("alice")
            .await
            .unwrap()
            .iter()
            .map(|k| k.id().as_str().to_string())
            .collect();

        assert_eq!(ids, vec!["key_old", "key_new"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryApiKeyRepository::new();
        repo.create(key("key_1", "alice", 0)).await.unwrap();

        assert!(repo.delete(&ApiKeyId::new("key_1")).await.unwrap());
        assert!(!repo.delete(&ApiKeyId::new("key_1")).await.unwrap());
    }
}
