//! Strategies command - lists the built-in strategies or ranks them for a context

use clap::Args;

use super::{parse_provider, print_json, TokenArgs};
use crate::api::types::StrategyInfo;
use crate::domain::provider::ProviderKind;
use crate::domain::strategy::{StrategyContext, StrategyRegistry};

/// Arguments for the strategies command
///
/// Without `--provider` and `--model` the strategies are only listed.
#[derive(Args, Clone, Debug)]
pub struct StrategiesArgs {
    #[arg(long, value_parser = parse_provider, requires = "model")]
    pub provider: Option<ProviderKind>,

    #[arg(long, requires = "provider")]
    pub model: Option<String>,

    /// Average tokens per call
    #[command(flatten)]
    pub tokens: TokenArgs,

    #[arg(long, default_value_t = 1)]
    pub calls_per_day: u64,

    #[arg(long, default_value_t = 30)]
    pub days: u32,
}

impl StrategiesArgs {
    fn context(&self) -> Option<StrategyContext> {
        let provider = self.provider?;
        let model = self.model.as_deref()?;

        Some(
            StrategyContext::new(provider, model, self.tokens.breakdown())
                .with_volume(self.calls_per_day, self.days),
        )
    }
}

pub fn run(args: StrategiesArgs) -> anyhow::Result<()> {
    let registry = StrategyRegistry::with_defaults();

    match args.context() {
        Some(ctx) => print_json(&registry.rank_strategies(&ctx)),
        None => {
            let strategies: Vec<StrategyInfo> =
                registry.get_all().iter().map(StrategyInfo::from).collect();
            print_json(&strategies)
        }
    }
}
