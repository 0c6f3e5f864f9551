//! Simulated provider adapters
//!
//! No vendor is contacted. Token counts are estimated from the request text,
//! latency is derived from the token count, and the response is priced with
//! the lab rate table.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::LabError;
use crate::domain::pricing::{PricingTable, TokenBreakdown, default_pricing_table, estimate_tokens};
use crate::domain::provider::{GenerateRequest, GeneratedResponse, ProviderGateway, ProviderKind};

const MIN_OUTPUT_TOKENS: u64 = 16;
const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 1024;
const PREVIEW_CHARS: usize = 40;

/// Latency profile of a simulated provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyProfile {
    pub base_ms: u64,
    /// Added per 100 tokens processed
    pub per_100_tokens_ms: u64,
}

impl LatencyProfile {
    pub fn for_provider(provider: ProviderKind) -> Self {
        match provider {
            ProviderKind::OpenAi => Self {
                base_ms: 200,
                per_100_tokens_ms: 20,
            },
            ProviderKind::Anthropic => Self {
                base_ms: 250,
                per_100_tokens_ms: 25,
            },
            ProviderKind::Google => Self {
                base_ms: 150,
                per_100_tokens_ms: 15,
            },
        }
    }

    pub fn latency_ms(&self, total_tokens: u64) -> u64 {
        self.base_ms + total_tokens * self.per_100_tokens_ms / 100
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    provider: ProviderKind,
    pricing: PricingTable,
    latency: LatencyProfile,
}

impl SimulatedGateway {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            pricing: default_pricing_table().clone(),
            latency: LatencyProfile::for_provider(provider),
        }
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.latency = latency;
        self
    }

    fn estimate_usage(&self, request: &GenerateRequest) -> TokenBreakdown {
        let input = estimate_tokens(&request.prompt);
        let system = request
            .system_prompt
            .as_deref()
            .map(estimate_tokens)
            .unwrap_or(0);

        let max_output = request
            .max_output_tokens
            .map(u64::from)
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);
        let output = (input / 2).max(MIN_OUTPUT_TOKENS).min(max_output);

        TokenBreakdown::new(input, output, system)
    }
}

#[async_trait]
impl ProviderGateway for SimulatedGateway {
    fn provider(&self) -> ProviderKind {
        self.provider
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        api_key: &str,
    ) -> Result<GeneratedResponse, LabError> {
        if api_key.trim().is_empty() {
            return Err(LabError::provider_unavailable(
                self.provider.as_str(),
                "No credential available for provider",
            ));
        }

        if request.prompt.trim().is_empty() {
            return Err(LabError::provider_execution(
                self.provider.as_str(),
                "Prompt is required",
            ));
        }

        let tokens = self.estimate_usage(request);
        let cost = self
            .pricing
            .calculate_cost(self.provider, &request.model, &tokens)?;

        let preview: String = request.prompt.chars().take(PREVIEW_CHARS).collect();
        let content = format!(
            "[simulated {}/{}] {} output tokens for: {}",
            self.provider,
            request.model,
            tokens.output,
            preview.trim()
        );

        tracing::debug!(
            provider = %self.provider,
            model = %request.model,
            tokens = tokens.total(),
            "Simulated provider call"
        );

        Ok(GeneratedResponse {
            content,
            model: request.model.clone(),
            latency_ms: self.latency.latency_ms(tokens.total()),
            tokens,
            cost,
            timestamp: Utc::now(),
            provider: self.provider,
        })
    }
}
