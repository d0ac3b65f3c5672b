use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrekError>;

/// Coarse classification of a failure, for callers that react differently
/// to each (retry after remediation, reject the request, report a fault).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An upstream artifact (dataset, trained model) does not exist yet.
    NotReady,
    /// The caller supplied a malformed request or configuration.
    InvalidInput,
    /// Storage or serialization failure.
    Internal,
}

#[derive(Debug, Error)]
pub enum TrekError {
    #[error("model not found at {}; run the `train` tool first", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("dataset not found at {}; run the `generate_dataset` tool first", path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("dataset {source_name} contains no rows; regenerate it with the `generate_dataset` tool")]
    EmptyDataset { source_name: String },

    #[error("malformed dataset at line {line}: {message}")]
    MalformedDataset { line: u64, message: String },

    #[error("missing feature `{0}`")]
    MissingFeature(String),

    #[error("feature `{name}` must be a finite number, got {value}")]
    InvalidFeature { name: String, value: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model bundle is inconsistent: {0}; retrain with the `train` tool")]
    CorruptBundle(String),

    #[error("estimator failed: {0}")]
    Fit(#[from] aprender::error::AprenderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TrekError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrekError::ModelNotFound { .. }
            | TrekError::DatasetNotFound { .. }
            | TrekError::EmptyDataset { .. } => ErrorKind::NotReady,
            TrekError::MissingFeature(_)
            | TrekError::InvalidFeature { .. }
            | TrekError::InvalidConfig(_)
            | TrekError::InvalidRequest(_) => ErrorKind::InvalidInput,
            TrekError::MalformedDataset { .. }
            | TrekError::CorruptBundle(_)
            | TrekError::Fit(_)
            | TrekError::Io(_)
            | TrekError::Csv(_)
            | TrekError::Json(_) => ErrorKind::Internal,
        }
    }
}
