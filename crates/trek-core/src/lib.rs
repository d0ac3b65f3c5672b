//! Offline trekking risk estimation.
//!
//! Pipeline order:
//!   1. `simulate` draws biased terrain + weather fragments.
//!   2. `dataset` assembles a balanced labeled dataset and its CSV form.
//!   3. `train` fits a tree classifier and evaluates it on a stratified hold-out.
//!   4. `store` persists the resulting `ModelBundle`.
//!   5. `predict` reloads the bundle and scores one feature vector;
//!      `explain` produces rule-based reasons from the same raw values.

pub mod config;
pub mod dataset;
pub mod error;
pub mod explain;
pub mod location;
pub mod model;
pub mod predict;
pub mod schema;
pub mod simulate;
pub mod store;
pub mod train;

pub use error::{ErrorKind, Result, TrekError};
pub use schema::{Feature, FeatureMap, FeatureRange, RiskLevel, TrailSegment, TARGET_COLUMN};
