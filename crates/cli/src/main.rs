mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    krknai_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    match args.command {
        Command::Analyze(a) => commands::analyze(a).await,
        Command::MergeConfig(m) => commands::merge_config(m),
        Command::Validate(v) => commands::validate(v),
    }
}
