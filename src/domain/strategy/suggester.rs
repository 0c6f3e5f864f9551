//! Turns a token analysis into ranked optimization suggestions

use serde::{Deserialize, Serialize};

use super::builtin::StrategyCategory;
use super::context::StrategyContext;
use super::registry::StrategyRegistry;
use crate::domain::analysis::TokenAnalysis;

/// Output share at or above which completions dominate spend
const HEAVY_OUTPUT_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    pub fn from_priority(priority: f64) -> Self {
        if priority >= 120.0 {
            Impact::High
        } else if priority >= 90.0 {
            Impact::Medium
        } else {
            Impact::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    pub strategy: String,
    pub category: StrategyCategory,
    pub reason: String,
    pub estimated_savings: f64,
    pub priority: f64,
    pub impact: Impact,
}

#[derive(Debug, Clone)]
pub struct OptimizationSuggester {
    registry: StrategyRegistry,
}

impl Default for OptimizationSuggester {
    fn default() -> Self {
        Self::new(StrategyRegistry::with_defaults())
    }
}

impl OptimizationSuggester {
    pub fn new(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn suggest(
        &self,
        analysis: &TokenAnalysis,
        ctx: &StrategyContext,
    ) -> Vec<OptimizationSuggestion> {
        if analysis.is_empty() {
            return Vec::new();
        }

        let triggered = triggered_strategies(analysis, ctx);
        if triggered.is_empty() {
            return Vec::new();
        }

        self.registry
            .rank_strategies(ctx)
            .into_iter()
            .filter_map(|ranking| {
                let reason = triggered
                    .iter()
                    .find(|(name, _)| *name == ranking.name)
                    .map(|(_, reason)| reason.clone())?;

                Some(OptimizationSuggestion {
                    impact: Impact::from_priority(ranking.priority),
                    strategy: ranking.name,
                    category: ranking.category,
                    reason,
                    estimated_savings: ranking.estimated_savings,
                    priority: ranking.priority,
                })
            })
            .collect()
    }
}

/// Strategy names flagged by the analysis, first reason wins
fn triggered_strategies(analysis: &TokenAnalysis, ctx: &StrategyContext) -> Vec<(&'static str, String)> {
    let mut triggered: Vec<(&'static str, String)> = Vec::new();
    let mut push = |name: &'static str, reason: String| {
        if !triggered.iter().any(|(n, _)| *n == name) {
            triggered.push((name, reason));
        }
    };

    if analysis.excessive_system_tokens {
        let share = analysis.distribution.system * 100.0;
        push(
            "system-prompt-trim",
            format!("System prompts take {share:.1}% of all tokens"),
        );
        push(
            "request-batching",
            format!("Batching would share system prompts that take {share:.1}% of tokens"),
        );
    }

    if analysis.high_average_tokens {
        let avg = analysis.average_tokens_per_call;
        push(
            "prompt-compression",
            format!("Calls average {avg:.0} tokens"),
        );
        push(
            "response-caching",
            format!("Large calls averaging {avg:.0} tokens are worth caching"),
        );
    }

    if !analysis.expensive_calls.is_empty() {
        push(
            "model-downgrade",
            format!(
                "{} of {} calls exceeded the cost threshold",
                analysis.expensive_calls.len(),
                analysis.call_count
            ),
        );
    }

    if analysis.distribution.output >= HEAVY_OUTPUT_SHARE {
        let share = analysis.distribution.output * 100.0;
        push(
            "model-downgrade",
            format!("Completions take {share:.1}% of tokens and are billed at the highest rate"),
        );
    }

    if ctx.repeated_ratio() > 0.0 {
        let share = ctx.repeated_ratio() * 100.0;
        push(
            "response-caching",
            format!("{share:.0}% of requests repeat an earlier one"),
        );
    }

    triggered
}
