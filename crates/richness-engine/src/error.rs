//! Error types for the inequality analysis engine

use std::time::Duration;
use thiserror::Error;

/// Errors that abort an analysis run.
///
/// Every variant is fatal for the run that raised it: no partial Gini or
/// curve is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Network or transport failure reaching the data source
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    /// The data source answered with something we could not decode
    #[error("Malformed response from data source: {0}")]
    SourceDecodeError(String),

    /// The class has no instances
    #[error("Insufficient data: the class has no instances")]
    InsufficientData,

    /// Zero total property mass, or zero spread across buckets
    #[error("Degenerate distribution: {0}")]
    DegenerateDistribution(String),

    /// Too many labels for exhaustive subset enumeration
    #[error("Capacity exceeded: {labels} property labels given, at most {max} supported")]
    CapacityExceeded { labels: usize, max: usize },

    /// Class id or property label that cannot be embedded in a query
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The whole run exceeded its deadline
    #[error("Analysis timed out after {0:?}")]
    TimedOut(Duration),

    /// The caller cancelled the run
    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Whether the failure was caused by the request itself rather than by
    /// the data source or the runtime.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InsufficientData
                | AnalysisError::DegenerateDistribution(_)
                | AnalysisError::CapacityExceeded { .. }
                | AnalysisError::InvalidIdentifier(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
