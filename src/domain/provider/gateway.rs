use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::ProviderKind;
use crate::domain::pricing::{CostBreakdown, TokenBreakdown};
use crate::domain::LabError;

#[cfg(test)]
use mockall::automock;

/// A single completion request sent through a gateway adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system_prompt: None,
            max_output_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }
}

/// Response produced by a gateway adapter, already priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub content: String,
    pub model: String,
    pub tokens: TokenBreakdown,
    pub cost: CostBreakdown,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub provider: ProviderKind,
}

/// Adapter for one provider's completion endpoint
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProviderGateway: Send + Sync + Debug {
    /// Provider served by this adapter
    fn provider(&self) -> ProviderKind;

    /// Run one completion with the given credential
    async fn generate(
        &self,
        request: &GenerateRequest,
        api_key: &str,
    ) -> Result<GeneratedResponse, LabError>;
}
