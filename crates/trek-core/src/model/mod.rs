//! Tree-based risk classifiers.
//!
//! `Model` wraps an aprender estimator together with the risk labels its
//! class indices stand for and the width of the rows it was fitted on. Only
//! the forest exposes probability estimates.

use std::fmt;
use std::str::FromStr;

use aprender::error::AprenderError;
use aprender::primitives::Matrix;
use aprender::tree::{DecisionTreeClassifier, RandomForestClassifier};
#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrekError};
use crate::schema::RiskLevel;

/// Rows per batch handed to the estimator during bulk prediction.
const BATCH_ROWS: usize = 256;

/// Which estimator the trainer fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    DecisionTree,
    #[default]
    RandomForest,
}

impl ClassifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::DecisionTree => "decision_tree",
            ClassifierKind::RandomForest => "random_forest",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierKind {
    type Err = TrekError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "decision_tree" => Ok(ClassifierKind::DecisionTree),
            "random_forest" => Ok(ClassifierKind::RandomForest),
            other => Err(TrekError::InvalidConfig(format!(
                "unknown classifier `{other}` (expected decision_tree or random_forest)"
            ))),
        }
    }
}

/// Hyperparameters handed to the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitParams {
    pub classifier: ClassifierKind,
    pub max_depth: usize,
    /// Ignored by the single tree.
    pub n_estimators: usize,
    /// Tree `i` of the forest bootstraps with seed `random_state + i`.
    pub random_state: u64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::RandomForest,
            max_depth: 10,
            n_estimators: 50,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    DecisionTree(DecisionTreeClassifier),
    RandomForest(RandomForestClassifier),
}

/// A fitted classifier over risk labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Label for each class index, in index order.
    pub classes: Vec<RiskLevel>,
    /// Width of the rows the estimator was fitted on.
    pub n_features: usize,
    pub estimator: Estimator,
}

/// Packs `rows` into the estimator's `f32` matrix layout.
fn to_matrix(rows: &[Vec<f64>], n_features: usize) -> Result<Matrix<f32>> {
    let data: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
    Ok(Matrix::from_vec(rows.len(), n_features, data).map_err(AprenderError::from)?)
}

/// Index of the largest share. Ties go to the lower class index.
fn argmax(shares: &[f32]) -> usize {
    let mut best = 0;
    for (i, &p) in shares.iter().enumerate() {
        if p > shares[best] {
            best = i;
        }
    }
    best
}

impl Model {
    /// Fits the estimator on `rows` labeled with indices into `classes`.
    pub fn fit(rows: &[Vec<f64>], y: &[usize], classes: Vec<RiskLevel>, params: FitParams) -> Result<Self> {
        let n_features = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != n_features) {
            return Err(TrekError::InvalidConfig("training rows differ in width".into()));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= classes.len()) {
            return Err(TrekError::InvalidConfig(format!(
                "label index {bad} outside {} known classes",
                classes.len()
            )));
        }
        if params.classifier == ClassifierKind::RandomForest && params.n_estimators == 0 {
            return Err(TrekError::InvalidConfig("forest needs at least one estimator".into()));
        }

        let x = to_matrix(rows, n_features)?;
        let estimator = match params.classifier {
            ClassifierKind::DecisionTree => {
                let mut tree = DecisionTreeClassifier::new().with_max_depth(params.max_depth);
                tree.fit(&x, y)?;
                Estimator::DecisionTree(tree)
            }
            ClassifierKind::RandomForest => {
                let mut forest = RandomForestClassifier::new(params.n_estimators)
                    .with_max_depth(params.max_depth)
                    .with_random_state(params.random_state);
                forest.fit(&x, y)?;
                Estimator::RandomForest(forest)
            }
        };
        debug!(classifier = %params.classifier, rows = rows.len(), n_features, "fitted estimator");

        Ok(Self { classes, n_features, estimator })
    }

    pub fn classes(&self) -> &[RiskLevel] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn kind(&self) -> ClassifierKind {
        match self.estimator {
            Estimator::DecisionTree(_) => ClassifierKind::DecisionTree,
            Estimator::RandomForest(_) => ClassifierKind::RandomForest,
        }
    }

    pub fn supports_proba(&self) -> bool {
        matches!(self.estimator, Estimator::RandomForest(_))
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        if row.len() != self.n_features {
            return Err(TrekError::CorruptBundle(format!(
                "model expects {} features, row has {}",
                self.n_features,
                row.len()
            )));
        }
        Ok(())
    }

    fn label(&self, class: usize) -> Result<RiskLevel> {
        self.classes.get(class).copied().ok_or_else(|| {
            TrekError::CorruptBundle(format!(
                "estimator returned class {class} but only {} labels are known",
                self.classes.len()
            ))
        })
    }

    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<RiskLevel>> {
        for row in rows {
            self.check_width(row)?;
        }
        let x = to_matrix(rows, self.n_features)?;
        let classes = match &self.estimator {
            Estimator::DecisionTree(tree) => tree.predict(&x),
            Estimator::RandomForest(forest) => {
                let proba = forest.predict_proba(&x);
                (0..rows.len())
                    .map(|i| {
                        let shares: Vec<f32> = (0..proba.n_cols()).map(|j| proba.get(i, j)).collect();
                        argmax(&shares)
                    })
                    .collect()
            }
        };
        classes.into_iter().map(|c| self.label(c)).collect()
    }

    /// `row` must be laid out in the feature order the model was trained on.
    pub fn predict(&self, row: &[f64]) -> Result<RiskLevel> {
        let mut labels = self.predict_batch(std::slice::from_ref(&row.to_vec()))?;
        labels.pop().ok_or_else(|| TrekError::CorruptBundle("estimator returned no prediction".into()))
    }

    /// Predicts every row, in batches.
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<RiskLevel>> {
        #[cfg(feature = "threading")]
        let batches = rows
            .par_chunks(BATCH_ROWS)
            .map(|chunk| self.predict_batch(chunk))
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "threading"))]
        let batches = rows
            .chunks(BATCH_ROWS)
            .map(|chunk| self.predict_batch(chunk))
            .collect::<Result<Vec<_>>>()?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Vote share per known label, or `None` when the estimator has no
    /// probability estimate.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Option<Vec<(RiskLevel, f64)>>> {
        let forest = match &self.estimator {
            Estimator::DecisionTree(_) => return Ok(None),
            Estimator::RandomForest(forest) => forest,
        };
        self.check_width(row)?;
        let x = to_matrix(std::slice::from_ref(&row.to_vec()), self.n_features)?;
        let proba = forest.predict_proba(&x);
        if proba.n_cols() != self.classes.len() {
            return Err(TrekError::CorruptBundle(format!(
                "estimator knows {} classes, bundle lists {}",
                proba.n_cols(),
                self.classes.len()
            )));
        }
        Ok(Some(
            self.classes
                .iter()
                .enumerate()
                .map(|(i, &label)| (label, f64::from(proba.get(0, i))))
                .collect(),
        ))
    }
}
