//! Survey inference CLI
//!
//! Command-line interface for batch prediction and data inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::inference::PredictionPipeline;
use crate::preprocessing::{missing, sanitizer, variance};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<24} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "survey-inference")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cluster-then-predict batch inference for survey data")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict every row of a CSV file
    Predict {
        /// Input data file (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding the model artifacts
        #[arg(short, long)]
        models_dir: Option<PathBuf>,

        /// Output predictions file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Predict cluster partitions in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Report missing values and constant columns of a CSV file
    Inspect {
        /// Input data file (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration, or write it to a file
    Config {
        /// File to write the configuration to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    Ok(match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_predict(
    data_path: &Path,
    config_path: Option<&Path>,
    models_dir: Option<&Path>,
    output: Option<&Path>,
    parallel: bool,
) -> anyhow::Result<()> {
    section("Predict");

    let mut config = load_config(config_path)?;
    if let Some(dir) = models_dir {
        config.inference.models_dir = dir.to_path_buf();
    }
    if let Some(output) = output {
        config.output_path = output.to_path_buf();
    }
    if parallel {
        config.inference.parallel_dispatch = true;
    }

    kv("Models", &config.inference.models_dir.display().to_string());
    kv("Clustering model", &config.inference.clustering_model);
    kv("Run log", &config.log_path.display().to_string());
    println!();

    step_run(&format!("Predicting {}", data_path.display()));
    let start = Instant::now();
    let pipeline = PredictionPipeline::new(config)?;
    let path = pipeline.predict_from_csv(data_path)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_ok(&format!("Predictions → {}", path.display().to_string().cyan()));
    println!();
    Ok(())
}

pub fn cmd_inspect(data_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    section("Inspect");
    let config = load_config(config_path)?;

    step_run("Loading data");
    let raw = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", raw.n_rows(), raw.n_cols()));

    step_run("Sanitizing");
    let pre = &config.preprocessing;
    let sanitized = sanitizer::sanitize(&raw, &pre.columns_to_drop, &pre.age_column)?;
    step_done(&format!("{} rows × {} cols", sanitized.n_rows(), sanitized.n_cols()));

    section("Missing values");
    let report = missing::count_missing(&sanitized);
    if report.has_missing {
        for entry in &report.columns_with_missing {
            kv(&entry.column, &entry.count.to_string());
        }
    } else {
        step_ok("No missing values");
    }

    section("Zero variance");
    let constant = variance::zero_variance_columns(&sanitized);
    if constant.is_empty() {
        step_ok("No constant numeric columns");
    } else {
        for column in &constant {
            println!("  {} {}", "!".yellow(), column);
        }
    }
    println!();
    Ok(())
}

pub fn cmd_config(output: Option<&Path>) -> anyhow::Result<()> {
    let config = PipelineConfig::default();
    match output {
        Some(path) => {
            config.save(path)?;
            step_ok(&format!("Configuration → {}", path.display()));
        }
        None => println!("{}", config.to_json()?),
    }
    Ok(())
}
