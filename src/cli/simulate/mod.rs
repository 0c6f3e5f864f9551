//! Simulate command - projects the cost of a usage profile

use clap::Args;

use super::{parse_provider, print_json, TokenArgs};
use crate::domain::provider::ProviderKind;
use crate::domain::simulation::{UsageProfile, UsageProjection, UsageSimulator};

/// Arguments for the simulate command
#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Provider: openai, anthropic or google
    #[arg(long, value_parser = parse_provider)]
    pub provider: ProviderKind,

    #[arg(long)]
    pub model: String,

    #[arg(long)]
    pub calls_per_day: u64,

    /// Average tokens per call
    #[command(flatten)]
    pub tokens: TokenArgs,

    /// Projection period in days
    #[arg(long, default_value_t = 30)]
    pub days: u32,

    /// Share of repeated requests, 0.0 to 1.0
    #[arg(long, default_value_t = 0.0)]
    pub repeated_request_ratio: f64,
}

impl SimulateArgs {
    pub fn profile(&self) -> UsageProfile {
        UsageProfile::new(self.provider, self.model.clone(), self.calls_per_day)
            .with_tokens(
                self.tokens.input_tokens,
                self.tokens.output_tokens,
                self.tokens.system_tokens,
            )
            .with_days(self.days)
            .with_repeated_request_ratio(self.repeated_request_ratio)
    }
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    print_json(&simulate(&args)?)
}

fn simulate(args: &SimulateArgs) -> anyhow::Result<UsageProjection> {
    Ok(UsageSimulator::default().simulate(&args.profile())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(calls_per_day: u64) -> SimulateArgs {
        SimulateArgs {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            calls_per_day,
            tokens: TokenArgs {
                input_tokens: 1500,
                output_tokens: 300,
                system_tokens: 500,
            },
            days: 7,
            repeated_request_ratio: 0.2,
        }
    }

    #[test]
    fn test_simulate_projects_over_days() {
        let projection = simulate(&args(100)).unwrap();

        assert_eq!(projection.days, 7);
        assert!(projection.projected_cost > projection.daily_cost);
        assert!(projection.optimized.projected_cost <= projection.projected_cost);
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        assert!(simulate(&args(0)).is_err());
    }
}
