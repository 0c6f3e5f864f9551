//! Built-in optimization strategies

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::context::StrategyContext;
use crate::domain::pricing::{
    CHARS_PER_TOKEN, TokenBreakdown, default_pricing_table, estimate_tokens, round_to,
};

static FILLER_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(i would like you to|could you please|can you please|please|kindly|basically|actually|really|very|just|in order to)\b[,]?",
    )
    .unwrap()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Compression ratio assumed when no prompt text is available
const DEFAULT_COMPRESSION_RATIO: f64 = 0.1;

/// Strategy category, drives the base ranking priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyCategory {
    Prompt,
    Caching,
    Batching,
    Model,
    #[serde(other)]
    Other,
}

impl StrategyCategory {
    pub fn base_priority(&self) -> f64 {
        match self {
            StrategyCategory::Caching => 100.0,
            StrategyCategory::Batching => 80.0,
            StrategyCategory::Prompt => 60.0,
            StrategyCategory::Model => 40.0,
            StrategyCategory::Other => 50.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyCategory::Prompt => "prompt",
            StrategyCategory::Caching => "caching",
            StrategyCategory::Batching => "batching",
            StrategyCategory::Model => "model",
            StrategyCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for StrategyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of applying a strategy to a context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub strategy: String,
    pub category: StrategyCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_model: Option<String>,
    pub tokens_saved_per_call: f64,
    /// Tokens saved over the projected volume
    pub estimated_savings: f64,
    pub description: String,
}

/// The closed set of strategies the lab knows about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizationStrategy {
    PromptCompression,
    SystemPromptTrim {
        /// Share of total tokens the system prompt is allowed to take
        target_share: f64,
    },
    ResponseCaching,
    RequestBatching {
        batch_size: u32,
    },
    ModelDowngrade,
}

impl OptimizationStrategy {
    pub fn prompt_compression() -> Self {
        OptimizationStrategy::PromptCompression
    }

    pub fn system_prompt_trim() -> Self {
        OptimizationStrategy::SystemPromptTrim { target_share: 0.15 }
    }

    pub fn response_caching() -> Self {
        OptimizationStrategy::ResponseCaching
    }

    pub fn request_batching() -> Self {
        OptimizationStrategy::RequestBatching { batch_size: 10 }
    }

    pub fn model_downgrade() -> Self {
        OptimizationStrategy::ModelDowngrade
    }

    /// All built-in strategies with their default settings
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::prompt_compression(),
            Self::system_prompt_trim(),
            Self::response_caching(),
            Self::request_batching(),
            Self::model_downgrade(),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptimizationStrategy::PromptCompression => "prompt-compression",
            OptimizationStrategy::SystemPromptTrim { .. } => "system-prompt-trim",
            OptimizationStrategy::ResponseCaching => "response-caching",
            OptimizationStrategy::RequestBatching { .. } => "request-batching",
            OptimizationStrategy::ModelDowngrade => "model-downgrade",
        }
    }

    pub fn category(&self) -> StrategyCategory {
        match self {
            OptimizationStrategy::PromptCompression
            | OptimizationStrategy::SystemPromptTrim { .. } => StrategyCategory::Prompt,
            OptimizationStrategy::ResponseCaching => StrategyCategory::Caching,
            OptimizationStrategy::RequestBatching { .. } => StrategyCategory::Batching,
            OptimizationStrategy::ModelDowngrade => StrategyCategory::Model,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OptimizationStrategy::PromptCompression => {
                "Collapse whitespace and strip filler phrases from the prompt"
            }
            OptimizationStrategy::SystemPromptTrim { .. } => {
                "Trim the system prompt down to its target share of tokens"
            }
            OptimizationStrategy::ResponseCaching => "Serve repeated requests from a cache",
            OptimizationStrategy::RequestBatching { .. } => {
                "Batch requests so they share one system prompt"
            }
            OptimizationStrategy::ModelDowngrade => {
                "Route requests to the provider's cheapest model"
            }
        }
    }

    /// Tokens saved on a single call
    pub fn tokens_saved_per_call(&self, ctx: &StrategyContext) -> f64 {
        let tokens = &ctx.tokens;

        match self {
            OptimizationStrategy::PromptCompression => {
                tokens.input as f64 * compression_ratio(ctx.prompt.as_deref())
            }
            OptimizationStrategy::SystemPromptTrim { target_share } => {
                let allowed = tokens.total() as f64 * target_share.clamp(0.0, 1.0);
                (tokens.system as f64 - allowed).max(0.0)
            }
            OptimizationStrategy::ResponseCaching => {
                tokens.total() as f64 * ctx.repeated_ratio()
            }
            OptimizationStrategy::RequestBatching { batch_size } => {
                let batch = (*batch_size).max(1) as f64;
                tokens.system as f64 * (1.0 - 1.0 / batch)
            }
            OptimizationStrategy::ModelDowngrade => {
                tokens.total() as f64 * downgrade_fraction(ctx)
            }
        }
    }

    /// Estimated tokens saved over the context's projected volume
    pub fn estimate_savings(&self, ctx: &StrategyContext) -> f64 {
        round_to(
            self.tokens_saved_per_call(ctx) * ctx.projected_calls() as f64,
            2,
        )
    }

    pub fn apply(&self, ctx: &StrategyContext) -> StrategyResult {
        let mut result = StrategyResult {
            strategy: self.name().to_string(),
            category: self.category(),
            optimized_prompt: None,
            optimized_system_prompt: None,
            recommended_model: None,
            tokens_saved_per_call: round_to(self.tokens_saved_per_call(ctx), 2),
            estimated_savings: self.estimate_savings(ctx),
            description: self.description().to_string(),
        };

        match self {
            OptimizationStrategy::PromptCompression => {
                result.optimized_prompt = ctx.prompt.as_deref().map(compress_text);
            }
            OptimizationStrategy::SystemPromptTrim { target_share } => {
                result.optimized_system_prompt = ctx
                    .system_prompt
                    .as_deref()
                    .map(|system| trim_system_prompt(system, &ctx.tokens, *target_share));
            }
            OptimizationStrategy::ModelDowngrade => {
                result.recommended_model = default_pricing_table()
                    .cheapest_model(ctx.provider)
                    .filter(|_| downgrade_fraction(ctx) > 0.0)
                    .map(|rate| rate.model.clone());
            }
            OptimizationStrategy::ResponseCaching
            | OptimizationStrategy::RequestBatching { .. } => {}
        }

        result
    }
}

/// Strip filler phrases and collapse runs of whitespace
pub fn compress_text(text: &str) -> String {
    let stripped = FILLER_PHRASES.replace_all(text, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Compress a system prompt, then cut it to its share of the call's tokens.
/// Without token counts there is no budget and only compression applies.
fn trim_system_prompt(system: &str, tokens: &TokenBreakdown, target_share: f64) -> String {
    let compressed = compress_text(system);

    let total = tokens.total();
    if total == 0 {
        return compressed;
    }

    let allowed = (total as f64 * target_share.clamp(0.0, 1.0)).floor() as u64;
    truncate_to_tokens(&compressed, allowed)
}

fn truncate_to_tokens(text: &str, max_tokens: u64) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }

    let max_chars =
        usize::try_from(max_tokens.saturating_mul(CHARS_PER_TOKEN)).unwrap_or(usize::MAX);
    text.chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn compression_ratio(prompt: Option<&str>) -> f64 {
    let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) else {
        return DEFAULT_COMPRESSION_RATIO;
    };

    let original = estimate_tokens(prompt);
    let compressed = estimate_tokens(&compress_text(prompt));

    if original == 0 {
        return 0.0;
    }

    original.saturating_sub(compressed) as f64 / original as f64
}

/// Share of spend saved by moving to the cheapest model, 0 when already there
fn downgrade_fraction(ctx: &StrategyContext) -> f64 {
    let table = default_pricing_table();

    let (Some(current), Some(cheapest)) = (
        table.rate_for(ctx.provider, &ctx.model),
        table.cheapest_model(ctx.provider),
    ) else {
        return 0.0;
    };

    let current_rate = current.prompt_per_1k + current.completion_per_1k;
    let cheapest_rate = cheapest.prompt_per_1k + cheapest.completion_per_1k;

    if current_rate <= 0.0 || cheapest_rate >= current_rate {
        return 0.0;
    }

    1.0 - cheapest_rate / current_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::ProviderKind;

    fn ctx(tokens: TokenBreakdown) -> StrategyContext {
        StrategyContext::new(ProviderKind::OpenAi, "gpt-4o", tokens).with_volume(100, 30)
    }

    #[test]
    fn test_names_and_categories() {
        let strategies = OptimizationStrategy::defaults();
        let names: Vec<_> = strategies.iter().map(|s| s.name()).collect();

        assert_eq!(
            names,
            vec![
                "prompt-compression",
                "system-prompt-trim",
                "response-caching",
                "request-batching",
                "model-downgrade"
            ]
        );
        assert_eq!(
            OptimizationStrategy::system_prompt_trim().category(),
            StrategyCategory::Prompt
        );
        assert_eq!(
            OptimizationStrategy::request_batching().category(),
            StrategyCategory::Batching
        );
    }

    #[test]
    fn test_compress_text() {
        assert_eq!(
            compress_text("Could you please   just summarize\n\n this   text"),
            "summarize this text"
        );
        assert_eq!(compress_text("plain"), "plain");
    }

    #[test]
    fn test_prompt_compression_without_text_uses_default_ratio() {
        let savings = OptimizationStrategy::prompt_compression()
            .estimate_savings(&ctx(TokenBreakdown::new(1000, 0, 0)));

        // 1000 * 0.1 * 3000 calls
        assert!((savings - 300_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_system_prompt_trim_apply_cuts_to_target_share() {
        let context = StrategyContext::new(
            ProviderKind::OpenAi,
            "gpt-4o",
            TokenBreakdown::new(100, 0, 100),
        )
        .with_prompts("question", Some("Please  abcd ".repeat(200)));
        let result = OptimizationStrategy::system_prompt_trim().apply(&context);

        // 15% of 200 tokens
        let trimmed = result.optimized_system_prompt.unwrap();
        assert!(estimate_tokens(&trimmed) <= 30);
        assert!(trimmed.starts_with("abcd abcd"));
        assert!(!trimmed.ends_with(' '));
        assert_eq!(result.tokens_saved_per_call, 70.0);
    }

    #[test]
    fn test_system_prompt_within_budget_is_only_compressed() {
        let context = StrategyContext::new(
            ProviderKind::OpenAi,
            "gpt-4o",
            TokenBreakdown::new(1000, 0, 100),
        )
            .with_prompts("question", Some("You are   basically a helpful assistant".to_string()));
        let result = OptimizationStrategy::system_prompt_trim().apply(&context);

        assert_eq!(
            result.optimized_system_prompt.as_deref(),
            Some("You are a helpful assistant")
        );
        assert_eq!(result.tokens_saved_per_call, 0.0);
    }

    #[test]
    fn test_prompt_compression_apply_returns_compressed_prompt() {
        let context = StrategyContext::new(ProviderKind::OpenAi, "gpt-4o", TokenBreakdown::default())
            .with_prompts("Please   basically explain rust", None);
        let result = OptimizationStrategy::prompt_compression().apply(&context);

        assert_eq!(result.optimized_prompt.as_deref(), Some("explain rust"));
        assert!(result.tokens_saved_per_call > 0.0);
    }

    #[test]
    fn test_system_prompt_trim_only_counts_excess() {
        let trim = OptimizationStrategy::system_prompt_trim();

        // 15% of 1000 allowed, 300 present
        let per_call = trim.tokens_saved_per_call(&ctx(TokenBreakdown::new(500, 200, 300)));
        assert!((per_call - 150.0).abs() < 1e-9);

        let none = trim.tokens_saved_per_call(&ctx(TokenBreakdown::new(900, 50, 50)));
        assert_eq!(none, 0.0);
    }

    #[test]
    fn test_response_caching_scales_with_repeat_ratio() {
        let caching = OptimizationStrategy::response_caching();
        let base = ctx(TokenBreakdown::new(400, 100, 0));

        assert_eq!(caching.estimate_savings(&base), 0.0);

        let repeated = base.with_repeated_request_ratio(0.5);
        assert!((caching.estimate_savings(&repeated) - 750_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_request_batching_shares_system_prompt() {
        let per_call = OptimizationStrategy::request_batching()
            .tokens_saved_per_call(&ctx(TokenBreakdown::new(100, 100, 200)));

        assert!((per_call - 180.0).abs() < 1e-9);

        let single = OptimizationStrategy::RequestBatching { batch_size: 0 }
            .tokens_saved_per_call(&ctx(TokenBreakdown::new(100, 100, 200)));
        assert_eq!(single, 0.0);
    }

    #[test]
    fn test_model_downgrade_recommends_cheapest_model() {
        let result = OptimizationStrategy::model_downgrade()
            .apply(&ctx(TokenBreakdown::new(1000, 500, 0)));

        assert_eq!(result.recommended_model.as_deref(), Some("gpt-4o-mini"));
        assert!(result.estimated_savings > 0.0);
    }

    #[test]
    fn test_model_downgrade_is_noop_on_cheapest_model() {
        let context = StrategyContext::new(
            ProviderKind::OpenAi,
            "gpt-4o-mini",
            TokenBreakdown::new(1000, 500, 0),
        );
        let result = OptimizationStrategy::model_downgrade().apply(&context);

        assert_eq!(result.estimated_savings, 0.0);
        assert!(result.recommended_model.is_none());
    }
}
