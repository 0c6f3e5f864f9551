//! Token and cost value types plus the cost calculation

use serde::{Deserialize, Serialize};

use super::rates::{PricingTable, default_pricing_table};
use crate::domain::LabError;
use crate::domain::provider::ProviderKind;

/// Token counts split by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBreakdown {
    #[serde(default)]
    pub input: u64,
    #[serde(default)]
    pub output: u64,
    #[serde(default)]
    pub system: u64,
}

impl TokenBreakdown {
    pub fn new(input: u64, output: u64, system: u64) -> Self {
        Self {
            input,
            output,
            system,
        }
    }

    /// Sum of all components, saturating at `u64::MAX`
    pub fn total(&self) -> u64 {
        self.input
            .saturating_add(self.output)
            .saturating_add(self.system)
    }

    /// Accumulate another breakdown into this one, saturating per component
    pub fn add(&mut self, other: &TokenBreakdown) {
        self.input = self.input.saturating_add(other.input);
        self.output = self.output.saturating_add(other.output);
        self.system = self.system.saturating_add(other.system);
    }
}

/// Cost of a single call, each component rounded on its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub prompt: f64,
    pub completion: f64,
    pub system: f64,
    pub total: f64,
}

/// Characters per token assumed by [`estimate_tokens`]
pub const CHARS_PER_TOKEN: u64 = 4;

/// Rough token count of a text: one token per four characters, rounded up
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(CHARS_PER_TOKEN)
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Round a monetary amount to 6 decimal places
pub fn round_cost(value: f64) -> f64 {
    round_to(value, 6)
}

/// Price a call with the built-in rate table
pub fn calculate_cost(
    provider: ProviderKind,
    model: &str,
    tokens: &TokenBreakdown,
) -> Result<CostBreakdown, LabError> {
    default_pricing_table().calculate_cost(provider, model, tokens)
}

impl PricingTable {
    /// Price a call.
    ///
    /// Each component is rounded to 6 decimals before summing, so the total
    /// can drift from the rounded exact sum by up to 1e-6 per component.
    pub fn calculate_cost(
        &self,
        provider: ProviderKind,
        model: &str,
        tokens: &TokenBreakdown,
    ) -> Result<CostBreakdown, LabError> {
        if model.trim().is_empty() {
            return Err(LabError::provider_execution(
                provider.as_str(),
                "Model is required to calculate cost",
            ));
        }

        let rate = self.rate_for(provider, model).ok_or_else(|| {
            LabError::provider_unavailable(provider.as_str(), "No pricing configured for provider")
        })?;

        let prompt = tokens.input as f64 / 1000.0 * rate.prompt_per_1k;
        let completion = tokens.output as f64 / 1000.0 * rate.completion_per_1k;
        let system = tokens.system as f64 / 1000.0 * rate.system_per_1k();

        let prompt = round_cost(prompt);
        let completion = round_cost(completion);
        let system = round_cost(system);

        Ok(CostBreakdown {
            prompt,
            completion,
            system,
            // re-rounded only to drop float noise from the addition
            total: round_cost(prompt + completion + system),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::rates::ModelRate;
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_token_sums_saturate() {
        let mut tokens = TokenBreakdown::new(u64::MAX, 1, 0);
        assert_eq!(tokens.total(), u64::MAX);

        tokens.add(&TokenBreakdown::new(5, 2, 3));
        assert_eq!(tokens, TokenBreakdown::new(u64::MAX, 3, 3));
    }

    #[test]
    fn test_gpt_4o_mini_breakdown() {
        let cost = calculate_cost(
            ProviderKind::OpenAi,
            "gpt-4o-mini",
            &TokenBreakdown::new(750, 250, 100),
        )
        .unwrap();

        assert!(approx(cost.prompt, 0.1125));
        assert!(approx(cost.completion, 0.15));
        assert!(approx(cost.system, 0.015));
        assert!(approx(cost.total, 0.2775));
    }

    #[test]
    fn test_unknown_model_falls_back_to_provider_default() {
        let cost = calculate_cost(
            ProviderKind::Google,
            "unknown-model",
            &TokenBreakdown::new(1000, 1000, 0),
        )
        .unwrap();

        assert!(approx(cost.total, 1.0));
        assert!(approx(cost.system, 0.0));
    }

    #[test]
    fn test_model_lookup_is_case_insensitive() {
        let lower = calculate_cost(
            ProviderKind::OpenAi,
            "gpt-4o-mini",
            &TokenBreakdown::new(1000, 0, 0),
        )
        .unwrap();
        let upper = calculate_cost(
            ProviderKind::OpenAi,
            "GPT-4O-MINI",
            &TokenBreakdown::new(1000, 0, 0),
        )
        .unwrap();

        assert_eq!(lower, upper);
        assert!(approx(upper.prompt, 0.15));
    }

    #[test]
    fn test_system_rate_overrides_prompt_rate() {
        let cost = calculate_cost(
            ProviderKind::Anthropic,
            "claude-3-5-sonnet",
            &TokenBreakdown::new(0, 0, 1000),
        )
        .unwrap();

        assert!(approx(cost.system, 3.75));
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let err = calculate_cost(ProviderKind::OpenAi, "  ", &TokenBreakdown::default())
            .unwrap_err();
        assert!(matches!(err, LabError::ProviderExecution { .. }));
    }

    #[test]
    fn test_components_round_before_summing() {
        // three components of 0.0000004 each round to zero, and so does the total
        let table = PricingTable::empty().with_default(
            ProviderKind::OpenAi,
            ModelRate::new("default", 0.0004, 0.0004),
        );
        let cost = table
            .calculate_cost(ProviderKind::OpenAi, "x", &TokenBreakdown::new(1, 1, 1))
            .unwrap();

        assert!(approx(cost.prompt, 0.0));
        assert!(approx(cost.completion, 0.0));
        assert!(approx(cost.system, 0.0));
        assert!(approx(cost.total, 0.0));
    }

    #[test]
    fn test_token_breakdown_total_and_add() {
        let mut tokens = TokenBreakdown::new(10, 20, 5);
        tokens.add(&TokenBreakdown::new(1, 2, 3));

        assert_eq!(tokens, TokenBreakdown::new(11, 22, 8));
        assert_eq!(tokens.total(), 41);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_round_to() {
        assert!(approx(round_to(0.123456789, 6), 0.123457));
        assert!(approx(round_to(0.33335, 4), 0.3334));
    }
}
