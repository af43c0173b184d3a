//! Resolution of external list sources for membership conditions.
//!
//! A `value_1` operand of `in_list` / `not_in_list` is either a literal
//! comma-separated list or a `"kind.source.column"` reference. Master and
//! sheet references read a column straight out of the corresponding
//! registry. Checklist references run the named checklist first and read the
//! column from its failed rows, so one rule can test membership in another
//! rule's violations. Recursion through checklists is guarded: a reference
//! cycle is a fatal configuration error.

use std::collections::BTreeSet;

use polars::prelude::DataFrame;
use tracing::debug;

use tablecheck_model::{ListSourceKind, ListSourceRef};

use crate::context::RunContext;
use crate::error::{ConditionError, EngineError};
use crate::frame_utils::{Cell, cell_to_string, column_cells, has_column};
use crate::runner::run_guarded;

/// Resolve a raw `value_1` operand into its value list. A parseable source
/// reference is resolved against the context; anything else is split on
/// commas as a literal list.
pub fn resolve_values(
    raw: &str,
    ctx: &RunContext,
    guard: &mut BTreeSet<String>,
) -> Result<Vec<String>, ConditionError> {
    match ListSourceRef::parse(raw) {
        Ok(source) => resolve(&source, ctx, guard),
        Err(_) => Ok(raw
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()),
    }
}

/// Resolve one parsed source reference.
pub fn resolve(
    source: &ListSourceRef,
    ctx: &RunContext,
    guard: &mut BTreeSet<String>,
) -> Result<Vec<String>, ConditionError> {
    match source.kind {
        ListSourceKind::Master => {
            let Some(frame) = ctx.masters.get(&source.source) else {
                return Err(ConditionError::Skip(format!(
                    "master table '{}' not found",
                    source.source
                )));
            };
            column_values(frame, &source.column, &source.source)
        }
        ListSourceKind::Sheet => {
            let Some(frame) = ctx.sheets.get(&source.source) else {
                return Err(ConditionError::Skip(format!(
                    "sheet '{}' not found",
                    source.source
                )));
            };
            column_values(frame, &source.column, &source.source)
        }
        ListSourceKind::Checklist => {
            let Some(config) = ctx.checklists.get(&source.source) else {
                return Err(ConditionError::Skip(format!(
                    "checklist '{}' not found",
                    source.source
                )));
            };
            if !guard.insert(source.source.clone()) {
                return Err(ConditionError::Fatal(EngineError::Configuration(format!(
                    "cyclic checklist reference through '{}'",
                    source.source
                ))));
            }
            debug!(checklist = %source.source, "resolving checklist list source");
            let result = run_guarded(config, ctx, guard);
            guard.remove(&source.source);
            let result = result.map_err(ConditionError::Fatal)?;
            column_values(&result.failed, &source.column, &source.source)
        }
    }
}

/// Distinct values of one column in first-occurrence order. Null cells are
/// skipped; blank strings are kept, since they are legitimate values to test
/// membership against.
fn column_values(
    frame: &DataFrame,
    column: &str,
    source_name: &str,
) -> Result<Vec<String>, ConditionError> {
    if !has_column(frame, column) {
        return Err(ConditionError::Skip(format!(
            "column '{column}' not found in list source '{source_name}'"
        )));
    }
    let mut seen = BTreeSet::new();
    let mut values = Vec::new();
    for cell in column_cells(frame, column)? {
        if matches!(cell, Cell::Null) {
            continue;
        }
        let text = cell_to_string(&cell);
        if seen.insert(text.clone()) {
            values.push(text);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{NamedFrom, Series};

    use super::*;

    fn ctx_with_master(name: &str, column: &str, values: Vec<Option<&str>>) -> RunContext {
        let series = Series::new(column.into(), values);
        let frame = DataFrame::new(vec![series.into()]).expect("frame");
        RunContext::new().with_master(name, frame)
    }

    #[test]
    fn literal_lists_split_on_commas() {
        let ctx = RunContext::new();
        let mut guard = BTreeSet::new();
        let values = resolve_values("A, B ,C,", &ctx, &mut guard).unwrap();
        assert_eq!(values, vec!["A", "B", "C"]);
    }

    #[test]
    fn master_references_read_the_registry() {
        let ctx = ctx_with_master("countries", "code", vec![Some("NL"), None, Some("DE"), Some("NL")]);
        let mut guard = BTreeSet::new();
        let values = resolve_values("master.countries.code", &ctx, &mut guard).unwrap();
        assert_eq!(values, vec!["NL", "DE"]);
    }

    #[test]
    fn missing_registry_entries_skip_the_condition() {
        let ctx = RunContext::new();
        let mut guard = BTreeSet::new();
        let outcome = resolve_values("sheet.Absent.code", &ctx, &mut guard);
        assert!(matches!(outcome, Err(ConditionError::Skip(_))));
    }
}
