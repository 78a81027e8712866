use anyhow::Result;
use clap::Parser;

use batch_merge::cli::commands::{config::ConfigCommand, run::RunCommand, Command};
use batch_merge::cli::{Cli, Commands};
use batch_merge::config::BatchMergeSettings;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env before reading settings so it can supply BATCH_MERGE_* values
    let _ = BatchMergeSettings::load_env_file();
    let settings = BatchMergeSettings::load()?;
    batch_merge::telemetry::init_telemetry(cli.log_json || settings.json_logs, &settings.log_level)?;

    let code = tokio::runtime::Runtime::new()?.block_on(async {
        match cli.command {
            Commands::Run(args) => RunCommand::new(args, settings).execute().await,
            Commands::Config => ConfigCommand::new(settings).execute().await,
        }
    })?;

    std::process::exit(code)
}
