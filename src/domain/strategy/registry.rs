use serde::{Deserialize, Serialize};

use super::builtin::{OptimizationStrategy, StrategyCategory};
use super::context::StrategyContext;

/// Cap on the savings-derived part of a priority
const MAX_SAVINGS_BONUS: f64 = 50.0;

/// One strategy's place in a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRanking {
    pub name: String,
    pub category: StrategyCategory,
    pub estimated_savings: f64,
    pub priority: f64,
}

/// Name-keyed strategy table that keeps registration order
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<OptimizationStrategy>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for strategy in OptimizationStrategy::defaults() {
            registry.register(strategy);
        }
        registry
    }

    /// Register a strategy; an existing one with the same name is replaced in place
    pub fn register(&mut self, strategy: OptimizationStrategy) {
        match self
            .strategies
            .iter_mut()
            .find(|s| s.name() == strategy.name())
        {
            Some(existing) => *existing = strategy,
            None => self.strategies.push(strategy),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptimizationStrategy> {
        self.strategies.iter().find(|s| s.name() == name)
    }

    pub fn get_all(&self) -> &[OptimizationStrategy] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn rank_strategies(&self, ctx: &StrategyContext) -> Vec<StrategyRanking> {
        rank(
            self.strategies
                .iter()
                .map(|s| (s.name().to_string(), s.category(), s.estimate_savings(ctx))),
        )
    }
}

pub fn priority(category: StrategyCategory, estimated_savings: f64) -> f64 {
    let bonus = (estimated_savings.max(0.0) / 100.0).min(MAX_SAVINGS_BONUS);
    category.base_priority() + bonus
}

/// Order estimates by priority, highest first; ties keep input order
pub fn rank(
    estimates: impl IntoIterator<Item = (String, StrategyCategory, f64)>,
) -> Vec<StrategyRanking> {
    let mut rankings: Vec<StrategyRanking> = estimates
        .into_iter()
        .map(|(name, category, estimated_savings)| StrategyRanking {
            priority: priority(category, estimated_savings),
            name,
            category,
            estimated_savings,
        })
        .collect();

    rankings.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    rankings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::TokenBreakdown;
    use crate::domain::provider::ProviderKind;

    #[test]
    fn test_caching_outranks_prompt_with_higher_raw_savings() {
        let rankings = rank(vec![
            ("compress".to_string(), StrategyCategory::Prompt, 10_000.0),
            ("cache".to_string(), StrategyCategory::Caching, 2_000.0),
        ]);

        assert_eq!(rankings[0].name, "cache");
        assert_eq!(rankings[0].priority, 120.0);
        assert_eq!(rankings[1].name, "compress");
        assert_eq!(rankings[1].priority, 110.0);
    }

    #[test]
    fn test_bonus_is_capped() {
        assert_eq!(priority(StrategyCategory::Model, 1_000_000.0), 90.0);
        assert_eq!(priority(StrategyCategory::Other, 0.0), 50.0);
        assert_eq!(priority(StrategyCategory::Batching, 250.0), 82.5);
    }

    #[test]
    fn test_small_savings_difference_still_orders() {
        let rankings = rank(vec![
            ("a".to_string(), StrategyCategory::Prompt, 0.0),
            ("b".to_string(), StrategyCategory::Prompt, 0.4),
        ]);

        assert_eq!(rankings[0].name, "b");
        assert!(rankings[0].priority > rankings[1].priority);
        assert_eq!(rankings[1].priority, 60.0);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let rankings = rank(vec![
            ("b".to_string(), StrategyCategory::Prompt, 0.0),
            ("a".to_string(), StrategyCategory::Prompt, 0.0),
            ("c".to_string(), StrategyCategory::Prompt, 0.0),
        ]);
        let names: Vec<_> = rankings.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_register_replaces_by_name_in_place() {
        let mut registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.len(), 5);

        registry.register(OptimizationStrategy::RequestBatching { batch_size: 4 });

        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get_all()[3].name(), "request-batching");
        assert_eq!(
            registry.get("request-batching"),
            Some(&OptimizationStrategy::RequestBatching { batch_size: 4 })
        );
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_rank_strategies_covers_every_registered_strategy() {
        let registry = StrategyRegistry::with_defaults();
        let ctx = StrategyContext::new(
            ProviderKind::OpenAi,
            "gpt-4o",
            TokenBreakdown::new(1000, 500, 500),
        )
        .with_volume(10, 30);

        let rankings = registry.rank_strategies(&ctx);

        assert_eq!(rankings.len(), 5);
        assert!(
            rankings
                .windows(2)
                .all(|pair| pair[0].priority >= pair[1].priority)
        );
    }

    #[test]
    fn test_empty_registry_ranks_nothing() {
        let registry = StrategyRegistry::new();
        let ctx = StrategyContext::new(ProviderKind::Google, "gemini-1.5-pro", TokenBreakdown::default());

        assert!(registry.is_empty());
        assert!(registry.rank_strategies(&ctx).is_empty());
    }
}
