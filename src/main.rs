//! Survey inference - Main Entry Point
//!
//! Batch prediction over survey exports with per-cluster specialist models.

use clap::Parser;
use survey_inference::cli::{cmd_config, cmd_inspect, cmd_predict, Cli, Commands};
use survey_inference::logging;

fn main() -> anyhow::Result<()> {
    logging::init_console();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict { data, config, models_dir, output, parallel } => {
            cmd_predict(
                &data,
                config.as_deref(),
                models_dir.as_deref(),
                output.as_deref(),
                parallel,
            )?;
        }
        Commands::Inspect { data, config } => {
            cmd_inspect(&data, config.as_deref())?;
        }
        Commands::Config { output } => {
            cmd_config(output.as_deref())?;
        }
    }

    Ok(())
}
