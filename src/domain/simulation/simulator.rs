use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::LabError;
use crate::domain::pricing::{
    CostBreakdown, PricingTable, TokenBreakdown, default_pricing_table, round_cost, round_to,
};
use crate::domain::provider::ProviderKind;
use crate::domain::strategy::{StrategyContext, StrategyRegistry};

/// Upper bound on the combined savings share
pub const MAX_COMBINED_SAVINGS: f64 = 0.9;

/// How many of the top-ranked strategies are applied
const APPLIED_STRATEGIES: usize = 3;

const MONTH_DAYS: u32 = 30;

/// A usage pattern to project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UsageProfile {
    pub provider: ProviderKind,
    #[validate(length(min = 1, max = 128))]
    pub model: String,
    #[validate(range(min = 1))]
    pub calls_per_day: u64,
    #[serde(default)]
    pub avg_input_tokens: u64,
    #[serde(default)]
    pub avg_output_tokens: u64,
    #[serde(default)]
    pub avg_system_tokens: u64,
    #[serde(default = "default_days")]
    #[validate(range(min = 1, max = 3650))]
    pub days: u32,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub repeated_request_ratio: f64,
}

fn default_days() -> u32 {
    MONTH_DAYS
}

impl UsageProfile {
    pub fn new(provider: ProviderKind, model: impl Into<String>, calls_per_day: u64) -> Self {
        Self {
            provider,
            model: model.into(),
            calls_per_day,
            avg_input_tokens: 0,
            avg_output_tokens: 0,
            avg_system_tokens: 0,
            days: default_days(),
            repeated_request_ratio: 0.0,
        }
    }

    pub fn with_tokens(mut self, input: u64, output: u64, system: u64) -> Self {
        self.avg_input_tokens = input;
        self.avg_output_tokens = output;
        self.avg_system_tokens = system;
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_repeated_request_ratio(mut self, ratio: f64) -> Self {
        self.repeated_request_ratio = ratio;
        self
    }

    pub fn tokens(&self) -> TokenBreakdown {
        TokenBreakdown::new(
            self.avg_input_tokens,
            self.avg_output_tokens,
            self.avg_system_tokens,
        )
    }

    pub fn to_context(&self) -> StrategyContext {
        StrategyContext::new(self.provider, self.model.clone(), self.tokens())
            .with_volume(self.calls_per_day, self.days)
            .with_repeated_request_ratio(self.repeated_request_ratio)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedStrategy {
    pub name: String,
    /// Share of per-call spend this strategy removes, 4 decimals
    pub savings_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedProjection {
    pub strategies: Vec<AppliedStrategy>,
    pub savings_fraction: f64,
    pub daily_cost: f64,
    pub projected_cost: f64,
    pub projected_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageProjection {
    pub provider: ProviderKind,
    pub model: String,
    pub calls_per_day: u64,
    pub days: u32,
    pub tokens_per_call: TokenBreakdown,
    pub cost_per_call: CostBreakdown,
    pub daily_cost: f64,
    pub monthly_cost: f64,
    /// Cost over `days`
    pub projected_cost: f64,
    pub optimized: OptimizedProjection,
}

#[derive(Debug, Clone)]
pub struct UsageSimulator {
    pricing: PricingTable,
    registry: StrategyRegistry,
}

impl Default for UsageSimulator {
    fn default() -> Self {
        Self::new(default_pricing_table().clone(), StrategyRegistry::with_defaults())
    }
}

impl UsageSimulator {
    pub fn new(pricing: PricingTable, registry: StrategyRegistry) -> Self {
        Self { pricing, registry }
    }

    pub fn simulate(&self, profile: &UsageProfile) -> Result<UsageProjection, LabError> {
        profile
            .validate()
            .map_err(|e| LabError::validation(format!("Invalid usage profile: {e}")))?;

        let tokens = profile.tokens();
        let cost_per_call = self
            .pricing
            .calculate_cost(profile.provider, &profile.model, &tokens)?;

        let daily = cost_per_call.total * profile.calls_per_day as f64;
        let projected = daily * profile.days as f64;

        let strategies = self.applied_strategies(profile, &tokens);
        let kept: f64 = strategies
            .iter()
            .map(|s| 1.0 - s.savings_fraction)
            .product();
        let savings_fraction = (1.0 - kept).clamp(0.0, MAX_COMBINED_SAVINGS);

        let optimized_daily = daily * (1.0 - savings_fraction);
        let optimized_projected = projected * (1.0 - savings_fraction);

        Ok(UsageProjection {
            provider: profile.provider,
            model: profile.model.clone(),
            calls_per_day: profile.calls_per_day,
            days: profile.days,
            tokens_per_call: tokens,
            cost_per_call,
            daily_cost: round_cost(daily),
            monthly_cost: round_cost(daily * MONTH_DAYS as f64),
            projected_cost: round_cost(projected),
            optimized: OptimizedProjection {
                strategies,
                savings_fraction: round_to(savings_fraction, 4),
                daily_cost: round_cost(optimized_daily),
                projected_cost: round_cost(optimized_projected),
                projected_savings: round_cost(projected - optimized_projected),
            },
        })
    }

    /// Top-ranked strategies that save anything, as per-call savings shares
    fn applied_strategies(
        &self,
        profile: &UsageProfile,
        tokens: &TokenBreakdown,
    ) -> Vec<AppliedStrategy> {
        let total = tokens.total();
        if total == 0 {
            return Vec::new();
        }

        let ctx = profile.to_context();

        self.registry
            .rank_strategies(&ctx)
            .into_iter()
            .filter(|ranking| ranking.estimated_savings > 0.0)
            .take(APPLIED_STRATEGIES)
            .filter_map(|ranking| {
                let strategy = self.registry.get(&ranking.name)?;
                let fraction = (strategy.tokens_saved_per_call(&ctx) / total as f64).clamp(0.0, 1.0);

                Some(AppliedStrategy {
                    name: ranking.name,
                    savings_fraction: round_to(fraction, 4),
                })
            })
            .collect()
    }
}
