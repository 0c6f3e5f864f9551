//! Per-provider, per-model rate table

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::provider::ProviderKind;

/// Rates for one model, in cost units per 1K tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRate {
    /// Model name (lowercase)
    pub model: String,
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
    /// System prompt rate; falls back to the prompt rate when absent
    #[serde(default)]
    pub system_per_1k: Option<f64>,
}

impl ModelRate {
    pub fn new(model: impl Into<String>, prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self {
            model: model.into().to_lowercase(),
            prompt_per_1k,
            completion_per_1k,
            system_per_1k: None,
        }
    }

    pub fn with_system_rate(mut self, system_per_1k: f64) -> Self {
        self.system_per_1k = Some(system_per_1k);
        self
    }

    pub fn system_per_1k(&self) -> f64 {
        self.system_per_1k.unwrap_or(self.prompt_per_1k)
    }
}

/// Known models for one provider plus the tier used for unknown names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPricing {
    pub default: ModelRate,
    #[serde(default)]
    pub models: Vec<ModelRate>,
}

/// Rate lookup table keyed by provider
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    providers: HashMap<ProviderKind, ProviderPricing>,
}

impl PricingTable {
    /// Table with no providers
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the default tier for a provider
    pub fn with_default(mut self, provider: ProviderKind, rate: ModelRate) -> Self {
        match self.providers.get_mut(&provider) {
            Some(pricing) => pricing.default = rate,
            None => {
                self.providers.insert(
                    provider,
                    ProviderPricing {
                        default: rate,
                        models: Vec::new(),
                    },
                );
            }
        }
        self
    }

    /// Add a model rate; the provider must already have a default tier
    pub fn with_model(mut self, provider: ProviderKind, rate: ModelRate) -> Self {
        if let Some(pricing) = self.providers.get_mut(&provider) {
            pricing.models.retain(|m| m.model != rate.model);
            pricing.models.push(rate);
        }
        self
    }

    /// Resolve the rate for a model.
    ///
    /// Matching is case-insensitive: exact name first, then the longest known
    /// model name the requested one starts with (dated snapshots such as
    /// `gpt-4o-2024-08-06`), then the provider default.
    pub fn rate_for(&self, provider: ProviderKind, model: &str) -> Option<&ModelRate> {
        let pricing = self.providers.get(&provider)?;
        let model = model.trim().to_lowercase();

        if let Some(rate) = pricing.models.iter().find(|m| m.model == model) {
            return Some(rate);
        }

        let prefixed = pricing
            .models
            .iter()
            .filter(|m| model.starts_with(&m.model))
            .max_by_key(|m| m.model.len());

        Some(prefixed.unwrap_or(&pricing.default))
    }

    /// Known rates for a provider, default tier excluded
    pub fn models(&self, provider: ProviderKind) -> &[ModelRate] {
        self.providers
            .get(&provider)
            .map(|p| p.models.as_slice())
            .unwrap_or(&[])
    }

    /// Cheapest known model for a provider by blended prompt + completion rate
    pub fn cheapest_model(&self, provider: ProviderKind) -> Option<&ModelRate> {
        self.models(provider).iter().min_by(|a, b| {
            let a_cost = a.prompt_per_1k + a.completion_per_1k;
            let b_cost = b.prompt_per_1k + b.completion_per_1k;
            a_cost.total_cmp(&b_cost)
        })
    }
}

static DEFAULT_TABLE: Lazy<PricingTable> = Lazy::new(build_default_table);

/// Built-in rate table
pub fn default_pricing_table() -> &'static PricingTable {
    &DEFAULT_TABLE
}

fn build_default_table() -> PricingTable {
    use ProviderKind::*;

    PricingTable::empty()
        // OpenAI
        .with_default(OpenAi, ModelRate::new("default", 0.5, 1.5))
        .with_model(OpenAi, ModelRate::new("gpt-4o", 2.5, 10.0))
        .with_model(OpenAi, ModelRate::new("gpt-4o-mini", 0.15, 0.6))
        .with_model(OpenAi, ModelRate::new("gpt-4-turbo", 10.0, 30.0))
        .with_model(OpenAi, ModelRate::new("gpt-3.5-turbo", 0.5, 1.5))
        // Anthropic
        .with_default(Anthropic, ModelRate::new("default", 3.0, 15.0))
        .with_model(
            Anthropic,
            ModelRate::new("claude-3-5-sonnet", 3.0, 15.0).with_system_rate(3.75),
        )
        .with_model(Anthropic, ModelRate::new("claude-3-opus", 15.0, 75.0))
        .with_model(Anthropic, ModelRate::new("claude-3-haiku", 0.25, 1.25))
        // Google
        .with_default(Google, ModelRate::new("default", 0.5, 0.5))
        .with_model(Google, ModelRate::new("gemini-1.5-pro", 1.25, 5.0))
        .with_model(Google, ModelRate::new("gemini-1.5-flash", 0.075, 0.3))
}
