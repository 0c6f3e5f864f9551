//! CLI module for the cost optimization lab
//!
//! Provides subcommands for running the lab server and for offline cost math:
//! - `serve`: HTTP API server
//! - `price`: cost of a single call
//! - `simulate`: projected cost of a usage profile
//! - `strategies`: list or rank optimization strategies

pub mod price;
pub mod serve;
pub mod simulate;
pub mod strategies;

use clap::{Args, Parser, Subcommand};

use crate::domain::pricing::TokenBreakdown;
use crate::domain::provider::ProviderKind;

/// API Cost Optimization Lab - sandboxed LLM usage experiments
#[derive(Parser)]
#[command(name = "cost-optimization-lab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the lab API server
    Serve(serve::ServeArgs),

    /// Price a single call from its token counts
    Price(price::PriceArgs),

    /// Project the cost of a usage profile
    Simulate(simulate::SimulateArgs),

    /// List strategies, or rank them for a usage context
    Strategies(strategies::StrategiesArgs),
}

/// Token counts shared by the offline commands
#[derive(Args, Clone, Debug, Default)]
pub struct TokenArgs {
    /// Input (prompt) tokens
    #[arg(long, default_value_t = 0)]
    pub input_tokens: u64,

    /// Output (completion) tokens
    #[arg(long, default_value_t = 0)]
    pub output_tokens: u64,

    /// System prompt tokens
    #[arg(long, default_value_t = 0)]
    pub system_tokens: u64,
}

impl TokenArgs {
    pub fn breakdown(&self) -> TokenBreakdown {
        TokenBreakdown::new(self.input_tokens, self.output_tokens, self.system_tokens)
    }
}

fn parse_provider(value: &str) -> Result<ProviderKind, String> {
    value.parse::<ProviderKind>().map_err(|e| e.to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
