use anyhow::{Context, Result};
use clap::Parser;

use git_rescue::cli::Cli;
use git_rescue::config::RescueConfig;
use git_rescue::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = RescueConfig::load_env_file() {
        eprintln!("⚠️  Ignoring unreadable .env file: {e}");
    }
    let config = RescueConfig::load_from(&cli.repo).context("Failed to load git-rescue configuration")?;
    init_telemetry(&config.observability)?;

    tokio::runtime::Runtime::new()?.block_on(cli.run(config))
}
