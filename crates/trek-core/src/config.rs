//! Runtime configuration shared by the tools.
//!
//! Built once at startup (defaults, optionally overlaid by a JSON file, then
//! by command-line flags) and passed by reference from there on.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrekError};
use crate::train::TrainParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub dataset_file: String,
    pub model_dir: PathBuf,
    pub model_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/raw"),
            dataset_file: "trekking_synthetic.csv".into(),
            model_dir: PathBuf::from("model"),
            model_file: "risk_model.json".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub n_per_class: usize,
    pub seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self { n_per_class: 200, seed: 42 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrekConfig {
    pub paths: PathsConfig,
    pub dataset: DatasetConfig,
    pub training: TrainParams,
}

impl TrekConfig {
    /// Defaults, overlaid by `path` when given. Missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)?;
        let config: TrekConfig = serde_json::from_str(&text)
            .map_err(|e| TrekError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.training.validate()?;
        if config.dataset.n_per_class == 0 {
            return Err(TrekError::InvalidConfig("dataset.n_per_class must be at least 1".into()));
        }
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.paths.data_dir.join(&self.paths.dataset_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.paths.model_dir.join(&self.paths.model_file)
    }
}
