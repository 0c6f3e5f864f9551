use serde::{Deserialize, Serialize};

use crate::domain::pricing::{TokenBreakdown, estimate_tokens};
use crate::domain::provider::ProviderKind;

/// What a strategy looks at: one representative call and its projected volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyContext {
    pub provider: ProviderKind,
    pub model: String,
    /// Representative user prompt; optional for volume-only estimates
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Average tokens per call
    #[serde(default)]
    pub tokens: TokenBreakdown,
    #[serde(default = "default_calls_per_day")]
    pub calls_per_day: u64,
    #[serde(default = "default_days")]
    pub days: u32,
    /// Share of requests identical to an earlier one, 0.0 to 1.0
    #[serde(default)]
    pub repeated_request_ratio: f64,
}

fn default_calls_per_day() -> u64 {
    1
}

fn default_days() -> u32 {
    30
}

impl StrategyContext {
    pub fn new(provider: ProviderKind, model: impl Into<String>, tokens: TokenBreakdown) -> Self {
        Self {
            provider,
            model: model.into(),
            prompt: None,
            system_prompt: None,
            tokens,
            calls_per_day: default_calls_per_day(),
            days: default_days(),
            repeated_request_ratio: 0.0,
        }
    }

    /// Set the prompt texts; token counts not already set are estimated from them
    pub fn with_prompts(mut self, prompt: impl Into<String>, system_prompt: Option<String>) -> Self {
        let prompt = prompt.into();

        if self.tokens.input == 0 {
            self.tokens.input = estimate_tokens(&prompt);
        }

        if let Some(ref system) = system_prompt {
            if self.tokens.system == 0 {
                self.tokens.system = estimate_tokens(system);
            }
        }

        self.prompt = Some(prompt);
        self.system_prompt = system_prompt;
        self
    }

    pub fn with_volume(mut self, calls_per_day: u64, days: u32) -> Self {
        self.calls_per_day = calls_per_day;
        self.days = days;
        self
    }

    pub fn with_repeated_request_ratio(mut self, ratio: f64) -> Self {
        self.repeated_request_ratio = ratio;
        self
    }

    /// Calls over the whole projection window
    pub fn projected_calls(&self) -> u64 {
        self.calls_per_day.saturating_mul(self.days as u64)
    }

    pub fn repeated_ratio(&self) -> f64 {
        self.repeated_request_ratio.clamp(0.0, 1.0)
    }
}
