//! Writes the balanced synthetic trekking dataset used for training.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use trek_core::config::TrekConfig;
use trek_core::dataset::generate;

#[derive(Parser, Debug)]
#[command(name = "generate_dataset", about = "Generate a labeled synthetic trail-segment dataset")]
struct Args {
    /// JSON configuration file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rows generated per risk level.
    #[arg(short, long)]
    n_per_class: Option<usize>,

    /// Seed for the simulators.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output CSV path [default: <data_dir>/<dataset_file>].
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = TrekConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(n) = args.n_per_class {
        config.dataset.n_per_class = n;
    }
    if let Some(seed) = args.seed {
        config.dataset.seed = seed;
    }
    anyhow::ensure!(config.dataset.n_per_class > 0, "--n-per-class must be at least 1");
    let output = args.output.unwrap_or_else(|| config.dataset_path());

    let dataset = generate(config.dataset.n_per_class, config.dataset.seed);
    dataset
        .save(&output)
        .with_context(|| format!("Write failed: {}", output.display()))?;

    println!("Wrote {} rows to {}", dataset.len(), output.display());
    for (label, count) in dataset.label_counts() {
        println!("  {label:<14} {count}");
    }
    Ok(())
}
