use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a collection, summary or marking run.
///
/// No variant is retried. Callers either abort or, for `Format`, skip the one file.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Required credential or setting is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// API response is missing a key the record layout depends on.
    #[error("fetch error ({context}): missing key `{key}`")]
    Fetch { context: String, key: String },

    /// Snapshot filename does not carry a `YYMMDD` date.
    #[error("format error: {path:?} does not match forsale_YYMMDD.csv")]
    Format { path: PathBuf },

    /// A record carries a field the first record's header doesn't have.
    #[error("record {row} has field `{field}` outside the snapshot header")]
    NonUniform { row: usize, field: String },

    #[error("upload failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    DataFrame(#[from] polars::prelude::PolarsError),
}

impl From<config::ConfigError> for CollectorError {
    fn from(error: config::ConfigError) -> Self {
        CollectorError::Configuration(error.to_string())
    }
}

impl CollectorError {
    pub(crate) fn missing_key(context: impl Into<String>, key: impl Into<String>) -> Self {
        CollectorError::Fetch {
            context: context.into(),
            key: key.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
