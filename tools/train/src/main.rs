//! Fits the risk classifier on the generated dataset and saves the bundle.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use trek_core::config::TrekConfig;
use trek_core::dataset::Dataset;
use trek_core::model::ClassifierKind;
use trek_core::store::{FileModelStore, ModelStore};
use trek_core::train::train;
use trek_core::{ErrorKind, TrekError};

#[derive(Parser, Debug)]
#[command(name = "train", about = "Train the trekking risk classifier and save the model bundle")]
struct Args {
    /// JSON configuration file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input CSV [default: <data_dir>/<dataset_file>].
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Output bundle [default: <model_dir>/<model_file>].
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// decision_tree or random_forest.
    #[arg(long)]
    classifier: Option<ClassifierKind>,

    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(long)]
    n_estimators: Option<usize>,

    /// Held-out fraction for evaluation.
    #[arg(long)]
    test_size: Option<f64>,

    #[arg(long)]
    random_state: Option<u64>,

    /// Also write the evaluation report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn run(args: Args) -> Result<()> {
    let mut config = TrekConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let params = &mut config.training;
    if let Some(c) = args.classifier {
        params.classifier = c;
    }
    if let Some(d) = args.max_depth {
        params.max_depth = d;
    }
    if let Some(n) = args.n_estimators {
        params.n_estimators = n;
    }
    if let Some(t) = args.test_size {
        params.test_size = t;
    }
    if let Some(r) = args.random_state {
        params.random_state = r;
    }

    let dataset_path = args.dataset.unwrap_or_else(|| config.dataset_path());
    let model_path = args.model.unwrap_or_else(|| config.model_path());

    let dataset = Dataset::load(&dataset_path)?;
    let outcome = train(&dataset, config.training)?;

    println!("Classifier: {}", config.training.classifier);
    println!("{}", outcome.report);

    FileModelStore::new(&model_path).save(&outcome.bundle)?;
    println!("Model saved to {}", model_path.display());

    if let Some(path) = args.report {
        let json = serde_json::to_string_pretty(&outcome.report)?;
        fs::write(&path, json).with_context(|| format!("Write failed: {}", path.display()))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TrekError>() {
                Some(trek) if trek.kind() == ErrorKind::NotReady => eprintln!("{trek}"),
                _ => error!("{e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
