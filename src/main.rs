use clap::Parser;
use cost_optimization_lab::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => cli::serve::run(args).await,
        Command::Price(args) => cli::price::run(args),
        Command::Simulate(args) => cli::simulate::run(args),
        Command::Strategies(args) => cli::strategies::run(args),
    }
}
