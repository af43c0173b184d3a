//! Declarative validation engine over in-memory tabular datasets.
//!
//! A run takes an immutable [`ChecklistConfig`](tablecheck_model::ChecklistConfig)
//! and a [`RunContext`] of named [`DataFrame`](polars::prelude::DataFrame)s,
//! joins the selected sheets along the configured chain, evaluates the
//! configured conditions over the joined frame, and returns the failed,
//! passed and residual rows. Identical inputs produce identical output.

pub mod column_ops;
pub mod context;
pub mod error;
pub mod frame_utils;
pub mod grouper;
pub mod join;
pub mod kind;
pub mod list_source;
pub mod predicate;
pub mod runner;

pub use context::RunContext;
pub use error::{EngineError, Result};
pub use join::{JoinOutcome, run_join_chain};
pub use runner::{RunResult, run};
