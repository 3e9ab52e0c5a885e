//! Error taxonomy for the planner pipeline.
//!
//! Validation and data-consistency failures abort a run before the
//! solver starts. Provider failures are retried with bounded backoff
//! before being surfaced. An infeasible routing outcome is not an
//! error; see [`crate::solver::SolveOutcome`].

use thiserror::Error;

/// A failure reported by an external collaborator (geocoder or
/// distance-matrix service). Wrapped into [`PlanError::Provider`]
/// once the retry budget is exhausted.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    /// Malformed run input: duplicate ids, unknown ids, missing depot.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The persisted distance data cannot support the requested run.
    #[error("inconsistent distance data: {0}")]
    DataConsistency(String),

    /// An external service kept failing after the retry budget.
    #[error("provider failed after {attempts} attempt(s): {source}")]
    Provider {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// A programming defect: negative duration, id collision. Always fatal.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ProviderError> for PlanError {
    fn from(source: ProviderError) -> Self {
        PlanError::Provider { attempts: 1, source }
    }
}
