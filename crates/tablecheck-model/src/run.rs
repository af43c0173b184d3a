//! Run-log projection of a validation run.
//!
//! The reporting collaborator persists one record per executed rule with the
//! failed rows reduced to a configured set of log columns. This type is the
//! serializable shape of that record; the engine builds it from a completed
//! run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One persisted run-log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Identifier of the checklist rule that produced this run.
    pub rule_id: String,
    /// Row count of the root dataset the chain started from.
    pub total_records: usize,
    /// Number of join steps executed.
    pub join_steps: usize,
    /// Number of rows that failed the predicates.
    pub failed_count: usize,
    /// Number of joined rows that passed.
    pub passed_count: usize,
    /// Failed rows projected onto the selected log columns, in row order.
    pub failed: Vec<BTreeMap<String, String>>,
}

impl RunRecord {
    /// True when every joined row passed.
    pub fn is_clean(&self) -> bool {
        self.failed_count == 0
    }
}
