//! Error taxonomy of the engine.
//!
//! The policy is deliberately asymmetric: configuration and join-stage
//! errors abort the whole run (a partially joined table is not reportable),
//! while individual condition failures degrade gracefully — the condition is
//! skipped with a warning and the run continues.

use polars::prelude::PolarsError;
use thiserror::Error;

/// A fatal error that aborts the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("missing sheet or table: {0}")]
    MissingDataset(String),

    #[error("join column not found: {column} in {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("could not convert {left} and {right} to compatible types")]
    TypeCoercion { left: String, right: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure of a single condition during compilation or evaluation.
///
/// `Skip` carries the warning surfaced to the caller; `Fatal` wraps an
/// [`EngineError`] that must abort the run (cycle detection, frame errors).
#[derive(Debug)]
pub enum ConditionError {
    Skip(String),
    Fatal(EngineError),
}

impl From<EngineError> for ConditionError {
    fn from(err: EngineError) -> Self {
        Self::Fatal(err)
    }
}
