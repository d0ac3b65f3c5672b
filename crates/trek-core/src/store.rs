//! Model bundle persistence.
//!
//! A bundle is written once per training run and then only read. The file
//! store writes to a temporary sibling and renames it into place, so
//! concurrent readers see either the previous bundle or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, TrekError};
use crate::model::Model;
use crate::schema::{Feature, TARGET_COLUMN};

/// Fitted classifier plus the metadata needed to feed it correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: Model,
    /// Column order of the training matrix.
    pub features: Vec<String>,
    pub target: String,
}

impl ModelBundle {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and validates a bundle.
    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: ModelBundle = serde_json::from_str(json)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Checks that the recorded metadata fits the model: one known schema
    /// feature per model input, the risk target, and a non-empty set of
    /// distinct class labels.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| -> Result<()> { Err(TrekError::CorruptBundle(msg)) };

        if self.target != TARGET_COLUMN {
            return corrupt(format!("target is `{}`, expected `{TARGET_COLUMN}`", self.target));
        }
        if self.features.len() != self.model.n_features() {
            return corrupt(format!(
                "model expects {} features, bundle lists {}",
                self.model.n_features(),
                self.features.len()
            ));
        }
        for (i, name) in self.features.iter().enumerate() {
            if Feature::from_name(name).is_none() {
                return corrupt(format!("unknown feature `{name}`"));
            }
            if self.features[..i].contains(name) {
                return corrupt(format!("feature `{name}` listed twice"));
            }
        }

        let classes = self.model.classes();
        if classes.is_empty() {
            return corrupt("no class labels".into());
        }
        for (i, label) in classes.iter().enumerate() {
            if classes[..i].contains(label) {
                return corrupt(format!("class `{label}` listed twice"));
            }
        }
        Ok(())
    }
}

pub trait ModelStore {
    /// Fails with `ModelNotFound` when nothing has been saved yet.
    fn load(&self) -> Result<ModelBundle>;
    fn save(&self, bundle: &ModelBundle) -> Result<()>;
}

// ── File ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl ModelStore for FileModelStore {
    fn load(&self) -> Result<ModelBundle> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TrekError::ModelNotFound { path: self.path.clone() });
            }
            Err(e) => return Err(e.into()),
        };
        let bundle: ModelBundle = serde_json::from_slice(&bytes)?;
        bundle.validate()?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "model bundle loaded");
        Ok(bundle)
    }

    fn save(&self, bundle: &ModelBundle) -> Result<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut tmp, bundle)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| TrekError::Io(e.error))?;

        info!(path = %self.path.display(), classifier = %bundle.model.kind(), "model bundle saved");
        Ok(())
    }
}

// ── Memory ────────────────────────────────────────────────────────────────────

/// Holds at most one bundle in memory.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    bundle: RwLock<Option<ModelBundle>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(bundle: ModelBundle) -> Self {
        Self { bundle: RwLock::new(Some(bundle)) }
    }
}

impl ModelStore for MemoryModelStore {
    fn load(&self) -> Result<ModelBundle> {
        let guard = self.bundle.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .clone()
            .ok_or_else(|| TrekError::ModelNotFound { path: PathBuf::from("<memory>") })
    }

    fn save(&self, bundle: &ModelBundle) -> Result<()> {
        let mut guard = self.bundle.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(bundle.clone());
        Ok(())
    }
}

impl<S: ModelStore + ?Sized> ModelStore for &S {
    fn load(&self) -> Result<ModelBundle> {
        (**self).load()
    }

    fn save(&self, bundle: &ModelBundle) -> Result<()> {
        (**self).save(bundle)
    }
}
