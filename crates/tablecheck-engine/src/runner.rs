//! The validation orchestrator.
//!
//! One `run` is a pure transformation from `(config, context)` to a
//! [`RunResult`]: select and transform the sheets, join them, evaluate the
//! conditions over the joined frame, and split it into failed and passed
//! rows. Residual rows (root rows that lacked a join partner somewhere
//! along the chain) are reported as their own category.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::DataFrame;
use tracing::debug;

use tablecheck_model::{ChecklistConfig, RunRecord};

use crate::column_ops::apply_operation;
use crate::context::RunContext;
use crate::error::{EngineError, Result};
use crate::frame_utils::{cell_to_string, column_cells, filter_rows, has_column};
use crate::grouper::evaluate_conditions;
use crate::join::{JoinOutcome, run_join_chain};

/// Everything one validation run produces.
#[derive(Debug)]
pub struct RunResult {
    /// The fully joined frame the conditions ran over.
    pub joined: DataFrame,
    /// Root rows that lacked a join partner somewhere along the chain.
    pub residual: DataFrame,
    /// Joined rows the conditions flagged.
    pub failed: DataFrame,
    /// Joined rows the conditions did not flag.
    pub passed: DataFrame,
    /// Row count of the root sheet.
    pub total_records: usize,
    pub join_steps: usize,
    /// Non-fatal warnings: skipped conditions and column operations.
    pub warnings: Vec<String>,
}

impl RunResult {
    /// Project the failed rows onto a persisted run record. Only the
    /// requested columns that exist in the failed frame are captured.
    pub fn to_record(&self, rule_id: &str, columns: &[String]) -> Result<RunRecord> {
        let selected: Vec<&String> = columns
            .iter()
            .filter(|name| has_column(&self.failed, name))
            .collect();
        let mut cells = Vec::with_capacity(selected.len());
        for name in &selected {
            cells.push(column_cells(&self.failed, name)?);
        }
        let failed = (0..self.failed.height())
            .map(|row| {
                selected
                    .iter()
                    .zip(&cells)
                    .map(|(name, column)| ((*name).clone(), cell_to_string(&column[row])))
                    .collect::<BTreeMap<String, String>>()
            })
            .collect();
        Ok(RunRecord {
            rule_id: rule_id.to_string(),
            total_records: self.total_records,
            join_steps: self.join_steps,
            failed_count: self.failed.height(),
            passed_count: self.passed.height(),
            failed,
        })
    }
}

/// Run one checklist against the context.
pub fn run(config: &ChecklistConfig, ctx: &RunContext) -> Result<RunResult> {
    let mut guard = BTreeSet::new();
    run_guarded(config, ctx, &mut guard)
}

/// Run with an explicit visited set, threaded through checklist-kind list
/// sources so reference cycles abort instead of recursing forever.
pub(crate) fn run_guarded(
    config: &ChecklistConfig,
    ctx: &RunContext,
    guard: &mut BTreeSet<String>,
) -> Result<RunResult> {
    if config.sheets.is_empty() {
        return Err(EngineError::Configuration(
            "no sheets selected".to_string(),
        ));
    }

    let mut warnings = Vec::new();
    let mut selected: BTreeMap<String, DataFrame> = BTreeMap::new();
    for sheet in &config.sheets {
        let frame = ctx
            .sheets
            .get(&sheet.name)
            .ok_or_else(|| EngineError::MissingDataset(sheet.name.clone()))?;
        let mut frame = frame.clone();
        for op in &sheet.col_operations {
            apply_operation(&mut frame, op, &mut warnings)?;
        }
        selected.insert(sheet.name.clone(), frame);
    }

    let outcome = if config.joins.is_empty() {
        // A single-sheet run validates the first selected sheet directly.
        let root = selected[&config.sheets[0].name].clone();
        let residual = filter_rows(&root, &vec![false; root.height()])?;
        let total_records = root.height();
        JoinOutcome {
            joined: root,
            residual,
            total_records,
            join_steps: 0,
        }
    } else {
        run_join_chain(&selected, &config.joins)?
    };
    debug!(
        rows = outcome.joined.height(),
        residual = outcome.residual.height(),
        steps = outcome.join_steps,
        "join stage complete"
    );

    let mask = evaluate_conditions(&config.conditions, &outcome.joined, ctx, guard, &mut warnings)?;
    let failed = filter_rows(&outcome.joined, &mask)?;
    let inverted: Vec<bool> = mask.iter().map(|flag| !flag).collect();
    let passed = filter_rows(&outcome.joined, &inverted)?;
    debug!(
        failed = failed.height(),
        passed = passed.height(),
        warnings = warnings.len(),
        "condition stage complete"
    );

    Ok(RunResult {
        joined: outcome.joined,
        residual: outcome.residual,
        failed,
        passed,
        total_records: outcome.total_records,
        join_steps: outcome.join_steps,
        warnings,
    })
}
