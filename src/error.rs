//! Error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("insufficient data: track has {point_count} points, at least 1 required")]
    InsufficientData { point_count: usize },
    #[error("empty batch: no tracks to combine")]
    EmptyBatch,
    #[error("track `{identity}` failed: {error}")]
    Track {
        identity: String,
        #[source]
        error: Box<MetricsError>,
    },
    #[error("failed to parse GPX: {0}")]
    GpxParse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl MetricsError {
    /// Tag the error with the source it came from
    pub fn for_source(self, identity: impl Into<String>) -> Self {
        MetricsError::Track {
            identity: identity.into(),
            error: Box::new(self),
        }
    }

    /// Source identity of a tagged track failure
    pub fn identity(&self) -> Option<&str> {
        match self {
            MetricsError::Track { identity, .. } => Some(identity.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
