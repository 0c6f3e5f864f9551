//! Price command - cost of a single call from the default rate table

use clap::Args;

use super::{parse_provider, print_json, TokenArgs};
use crate::api::lab::simulation::PriceResponse;
use crate::domain::pricing::default_pricing_table;
use crate::domain::provider::ProviderKind;

/// Arguments for the price command
#[derive(Args, Clone, Debug)]
pub struct PriceArgs {
    /// Provider: openai, anthropic or google
    #[arg(long, value_parser = parse_provider)]
    pub provider: ProviderKind,

    /// Model name; unknown models use the provider's default rate
    #[arg(long)]
    pub model: String,

    #[command(flatten)]
    pub tokens: TokenArgs,
}

pub fn run(args: PriceArgs) -> anyhow::Result<()> {
    print_json(&price(&args)?)
}

fn price(args: &PriceArgs) -> anyhow::Result<PriceResponse> {
    let tokens = args.tokens.breakdown();
    let cost = default_pricing_table().calculate_cost(args.provider, &args.model, &tokens)?;

    Ok(PriceResponse {
        provider: args.provider,
        model: args.model.clone(),
        total_tokens: tokens.total(),
        tokens,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_uses_default_rates() {
        let args = PriceArgs {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            tokens: TokenArgs {
                input_tokens: 1000,
                output_tokens: 100,
                system_tokens: 0,
            },
        };

        let response = price(&args).unwrap();
        assert_eq!(response.total_tokens, 1100);
        assert!((response.cost.total - 0.21).abs() < 1e-9);
    }

    #[test]
    fn test_blank_model_fails() {
        let args = PriceArgs {
            provider: ProviderKind::OpenAi,
            model: " ".to_string(),
            tokens: TokenArgs::default(),
        };

        assert!(price(&args).is_err());
    }
}
