//! Run-level errors.
//!
//! Per-task problems are [`crate::task::TaskFailure`]s and do not stop a
//! run. A [`WoflError`] does.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::observation::InvariantViolation;

/// Errors that abort a planning pass or a production run.
#[derive(Debug, Error)]
pub enum WoflError {
    /// An atemporal product was found with more than one acquisition time.
    #[error("{product} must have exactly one timestamp, found {}", .timestamps.len())]
    CatalogConsistency {
        product: String,
        timestamps: Vec<DateTime<Utc>>,
    },

    /// A produced output broke the observation byte contract.
    #[error("observation contract violated: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The async runtime could not be built or failed.
    #[error("runtime error: {0}")]
    Runtime(String),
}
