//! Interactive risk check for one trail segment.
//!
//! Feature values come from flags, a `--location` name, or prompts on stdin
//! (Enter keeps the default). Prints the risk level, confidence and reasons,
//! or the same payload as JSON with `--json`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use trek_core::config::TrekConfig;
use trek_core::explain::display_reasons;
use trek_core::location::segment_from_location;
use trek_core::predict::{Confidence, Predictor, RiskAssessment};
use trek_core::store::FileModelStore;
use trek_core::{ErrorKind, Feature, FeatureMap, TrekError};

#[derive(Parser, Debug)]
#[command(name = "predict", about = "Estimate trekking risk for a trail segment")]
struct Args {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model bundle [default: <model_dir>/<model_file>].
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Derive the features from a location name instead of asking.
    #[arg(short, long, conflicts_with_all = ["slope_angle", "altitude_change", "weather_severity",
        "trail_difficulty", "path_width_m", "visibility_km"])]
    location: Option<String>,

    #[arg(long)]
    slope_angle: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    altitude_change: Option<f64>,
    #[arg(long)]
    weather_severity: Option<i32>,
    #[arg(long)]
    trail_difficulty: Option<i32>,
    #[arg(long)]
    path_width_m: Option<f64>,
    #[arg(long)]
    visibility_km: Option<f64>,

    /// Use defaults for features not given as flags instead of prompting.
    #[arg(long)]
    no_input: bool,

    /// Print the assessment as JSON.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn flag(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::SlopeAngle      => self.slope_angle,
            Feature::AltitudeChange  => self.altitude_change,
            Feature::WeatherSeverity => self.weather_severity.map(f64::from),
            Feature::TrailDifficulty => self.trail_difficulty.map(f64::from),
            Feature::PathWidth       => self.path_width_m,
            Feature::Visibility      => self.visibility_km,
        }
    }
}

/// A moderate segment.
fn default_value(feature: Feature) -> f64 {
    match feature {
        Feature::SlopeAngle      => 12.0,
        Feature::AltitudeChange  => 80.0,
        Feature::WeatherSeverity => 2.0,
        Feature::TrailDifficulty => 2.0,
        Feature::PathWidth       => 2.0,
        Feature::Visibility      => 8.0,
    }
}

/// Blank or unparsable input keeps the default. Integer features accept
/// whole numbers only.
fn parse_value(raw: &str, feature: Feature, default: f64) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return default;
    }
    if feature.range().is_integer() {
        raw.parse::<i32>().map(f64::from).unwrap_or(default)
    } else {
        raw.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(default)
    }
}

fn prompt_features(args: &Args) -> Result<FeatureMap> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    let interactive = !args.no_input && Feature::ALL.iter().any(|&f| args.flag(f).is_none());
    if interactive {
        println!("Enter segment features (or press Enter for default).");
    }

    let mut features = FeatureMap::new();
    for feature in Feature::ALL {
        let default = default_value(feature);
        let value = match args.flag(feature) {
            Some(v) => v,
            None if !interactive => default,
            None => {
                let (lo, hi) = feature.range().bounds();
                print!("  {} [{lo}-{hi}] (default {default}): ", feature.name());
                stdout.flush()?;
                let mut line = String::new();
                input.read_line(&mut line).context("Failed to read from stdin")?;
                parse_value(&line, feature, default)
            }
        };
        features.insert(feature.name().to_string(), value);
    }
    Ok(features)
}

fn print_assessment(assessment: &RiskAssessment) {
    println!("-----------------------------------");
    println!("Predicted Risk Level: {}", assessment.risk_level);
    if let Confidence::Distribution(dist) = &assessment.confidence {
        println!("Confidence:");
        for (level, p) in dist {
            println!("  {level}: {p:.2}");
        }
    }
    println!();
    println!("Reasoning:");
    for reason in display_reasons(&assessment.reasons) {
        println!("- {reason}");
    }
    println!("-----------------------------------");
}

fn run(args: Args) -> Result<()> {
    let config = TrekConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let model_path = args.model.clone().unwrap_or_else(|| config.model_path());
    let predictor = Predictor::new(FileModelStore::new(model_path));

    let features = match &args.location {
        Some(location) => {
            let segment = segment_from_location(location);
            if !args.json {
                println!("Location: {location}");
                for feature in Feature::ALL {
                    println!("  {}: {:.2}", feature.name(), segment.get(feature));
                }
            }
            segment.to_feature_map()
        }
        None => prompt_features(&args)?,
    };

    let assessment = predictor.assess(&features)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        print_assessment(&assessment);
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TrekError>() {
                Some(trek) if trek.kind() == ErrorKind::NotReady => {
                    eprintln!("Error: {trek}");
                    eprintln!("Run: generate_dataset");
                    eprintln!("Then: train");
                }
                _ => error!("{e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
