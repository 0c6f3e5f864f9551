//! Stored key repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{ApiKeyId, StoredApiKey};
use crate::domain::LabError;

#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    async fn create(&self, key: StoredApiKey) -> Result<StoredApiKey, LabError>;

    async fn get(&self, id: &ApiKeyId) -> Result<Option<StoredApiKey>, LabError>;

    /// Keys owned by a user, oldest first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<StoredApiKey>, LabError>;

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, LabError>;
}
