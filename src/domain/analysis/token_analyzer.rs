//! Token usage analysis over a batch of call records

use serde::{Deserialize, Serialize};

use crate::domain::call::ApiCallRecord;
use crate::domain::pricing::{TokenBreakdown, round_cost, round_to};

/// Thresholds used to flag expensive calls and unhealthy token mixes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerThresholds {
    /// Calls costing at least this much are flagged
    #[serde(default = "default_cost_threshold")]
    pub cost_threshold: f64,
    /// Calls using at least this many tokens are flagged
    #[serde(default = "default_token_threshold")]
    pub token_threshold: u64,
    /// System-token share at or above which the mix is flagged
    #[serde(default = "default_system_ratio_threshold")]
    pub system_ratio_threshold: f64,
}

fn default_cost_threshold() -> f64 {
    0.75
}

fn default_token_threshold() -> u64 {
    2000
}

fn default_system_ratio_threshold() -> f64 {
    0.2
}

impl Default for AnalyzerThresholds {
    fn default() -> Self {
        Self {
            cost_threshold: default_cost_threshold(),
            token_threshold: default_token_threshold(),
            system_ratio_threshold: default_system_ratio_threshold(),
        }
    }
}

/// Share of each token kind in the total, 4 decimal places
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenDistribution {
    pub input: f64,
    pub output: f64,
    pub system: f64,
}

/// Result of [`TokenAnalyzer::analyze`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAnalysis {
    pub call_count: u64,
    pub tokens: TokenBreakdown,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub average_cost_per_call: f64,
    pub average_tokens_per_call: f64,
    pub average_latency_ms: f64,
    pub distribution: TokenDistribution,
    pub expensive_calls: Vec<ApiCallRecord>,
    pub token_heavy_calls: Vec<ApiCallRecord>,
    pub high_average_tokens: bool,
    pub excessive_system_tokens: bool,
}

impl TokenAnalysis {
    /// Canonical result for an empty batch
    pub fn empty() -> Self {
        Self {
            call_count: 0,
            tokens: TokenBreakdown::default(),
            total_tokens: 0,
            total_cost: 0.0,
            average_cost_per_call: 0.0,
            average_tokens_per_call: 0.0,
            average_latency_ms: 0.0,
            distribution: TokenDistribution::default(),
            expensive_calls: Vec::new(),
            token_heavy_calls: Vec::new(),
            high_average_tokens: false,
            excessive_system_tokens: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.call_count == 0
    }
}

/// Stateless analyzer configured with thresholds
#[derive(Debug, Clone, Default)]
pub struct TokenAnalyzer {
    thresholds: AnalyzerThresholds,
}

impl TokenAnalyzer {
    pub fn new(thresholds: AnalyzerThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AnalyzerThresholds {
        &self.thresholds
    }

    pub fn analyze(&self, calls: &[ApiCallRecord]) -> TokenAnalysis {
        if calls.is_empty() {
            return TokenAnalysis::empty();
        }

        let mut tokens = TokenBreakdown::default();
        let mut total_cost = 0.0;
        let mut latency_sum = 0u64;

        for call in calls {
            tokens.add(&call.tokens);
            total_cost += call.cost;
            latency_sum = latency_sum.saturating_add(call.latency_ms);
        }

        let count = calls.len() as f64;
        let total_tokens = tokens.total();
        let average_tokens_per_call = total_tokens as f64 / count;
        let distribution = distribution(&tokens);

        let expensive_calls = calls
            .iter()
            .filter(|c| c.cost >= self.thresholds.cost_threshold)
            .cloned()
            .collect();

        let token_heavy_calls = calls
            .iter()
            .filter(|c| c.total_tokens() >= self.thresholds.token_threshold)
            .cloned()
            .collect();

        TokenAnalysis {
            call_count: calls.len() as u64,
            tokens,
            total_tokens,
            total_cost: round_cost(total_cost),
            average_cost_per_call: round_cost(total_cost / count),
            average_tokens_per_call: round_to(average_tokens_per_call, 2),
            average_latency_ms: round_to(latency_sum as f64 / count, 2),
            distribution,
            expensive_calls,
            token_heavy_calls,
            high_average_tokens: average_tokens_per_call >= self.thresholds.token_threshold as f64,
            excessive_system_tokens: total_tokens > 0
                && distribution.system >= self.thresholds.system_ratio_threshold,
        }
    }
}

fn distribution(tokens: &TokenBreakdown) -> TokenDistribution {
    let total = tokens.total();

    if total == 0 {
        return TokenDistribution::default();
    }

    let share = |n: u64| round_to(n as f64 / total as f64, 4);

    TokenDistribution {
        input: share(tokens.input),
        output: share(tokens.output),
        system: share(tokens.system),
    }
}
