//! Ordered join chain with residual tracking.
//!
//! The first step's left sheet is the root of the chain. Every root row gets
//! a hidden identity before the first merge, and the identity travels through
//! each step. A left row with no right-side partner at some step feeds the
//! residual (for anti steps the polarity flips: partnered rows feed it); the
//! residual frame is the root rows whose identity was recorded anywhere
//! along the chain, de-duplicated, in root order.
//!
//! Anti joins run the same physical merge as their base flavor and then keep
//! only the rows with no partner on the right side. `anti_right` and
//! `anti_inner` consequently always produce an empty frame, mirroring the
//! behavior these configurations have always had.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::debug;

use tablecheck_model::{JoinSpec, JoinType};

use crate::error::{EngineError, Result};
use crate::frame_utils::{
    Cell, cell_to_i64, column_cells, filter_rows, has_column, series_from_cells,
};
use crate::kind::{KeyRepr, infer_kind, key_repr, key_values};

/// Hidden root-row identity column, present only while a chain is running.
pub(crate) const ROOT_ID: &str = "__tablecheck_root_id";

/// Result of a full join chain.
#[derive(Debug)]
pub struct JoinOutcome {
    /// The accumulated frame after the last step.
    pub joined: DataFrame,
    /// Root rows that lacked a join partner at some step, in root order and
    /// root schema. A left or outer step keeps such rows in `joined` too.
    pub residual: DataFrame,
    pub total_records: usize,
    pub join_steps: usize,
}

/// Run the whole chain against the named sheets.
pub fn run_join_chain(
    sheets: &BTreeMap<String, DataFrame>,
    joins: &[JoinSpec],
) -> Result<JoinOutcome> {
    if joins.is_empty() {
        return Err(EngineError::Configuration(
            "join chain is empty".to_string(),
        ));
    }
    for (idx, step) in joins.iter().enumerate() {
        let malformed = step.left_table.trim().is_empty()
            || step.right_table.trim().is_empty()
            || step.on_cols.is_empty()
            || step
                .on_cols
                .iter()
                .any(|key| key.left_column.trim().is_empty() || key.right_column.trim().is_empty());
        if malformed {
            return Err(EngineError::Configuration(format!(
                "invalid join specification at step {}",
                idx + 1
            )));
        }
    }

    let root = sheets
        .get(&joins[0].left_table)
        .ok_or_else(|| EngineError::MissingDataset(joins[0].left_table.clone()))?;
    let mut current = tag_root(root)?;

    let mut lost: BTreeSet<i64> = BTreeSet::new();
    for step in joins {
        let right = sheets
            .get(&step.right_table)
            .ok_or_else(|| EngineError::MissingDataset(step.right_table.clone()))?;
        current = join_step(&current, right, step, &mut lost)?;
        debug!(
            left = %step.left_table,
            right = %step.right_table,
            join_type = ?step.join_type,
            rows = current.height(),
            dropped_roots = lost.len(),
            "join step applied"
        );
    }

    // Root ids are the root row numbers, so the mask is positional.
    let residual_mask: Vec<bool> = (0..root.height() as i64)
        .map(|id| lost.contains(&id))
        .collect();
    let residual = filter_rows(root, &residual_mask)?;
    let joined = current.drop(ROOT_ID)?;
    // Record counts are reported against the root sheet, whatever the chain
    // did to the row multiplicity.
    let total_records = root.height();

    Ok(JoinOutcome {
        joined,
        residual,
        total_records,
        join_steps: joins.len(),
    })
}

fn tag_root(root: &DataFrame) -> Result<DataFrame> {
    let ids: Vec<i64> = (0..root.height() as i64).collect();
    let mut tagged = root.clone();
    tagged.with_column(Series::new(ROOT_ID.into(), ids))?;
    Ok(tagged)
}

/// Canonical composite keys per row; `None` parts mark null key cells, which
/// match each other.
fn composite_keys(
    df: &DataFrame,
    table: &str,
    columns: &[(&str, KeyRepr)],
) -> Result<Vec<Vec<Option<String>>>> {
    let mut parts: Vec<Vec<Option<String>>> = Vec::with_capacity(columns.len());
    for (name, repr) in columns {
        let values = key_values(df, name, *repr)?.ok_or_else(|| EngineError::TypeCoercion {
            left: format!("{table}.{name}"),
            right: "join key".to_string(),
        })?;
        parts.push(values);
    }
    let height = df.height();
    Ok((0..height)
        .map(|row| parts.iter().map(|part| part[row].clone()).collect())
        .collect())
}

fn join_step(
    left: &DataFrame,
    right: &DataFrame,
    step: &JoinSpec,
    lost: &mut BTreeSet<i64>,
) -> Result<DataFrame> {
    for key in &step.on_cols {
        if !has_column(left, &key.left_column) {
            return Err(EngineError::ColumnNotFound {
                table: step.left_table.clone(),
                column: key.left_column.clone(),
            });
        }
        if !has_column(right, &key.right_column) {
            return Err(EngineError::ColumnNotFound {
                table: step.right_table.clone(),
                column: key.right_column.clone(),
            });
        }
    }

    let mut left_cols = Vec::with_capacity(step.on_cols.len());
    let mut right_cols = Vec::with_capacity(step.on_cols.len());
    for key in &step.on_cols {
        let repr = key_repr(
            infer_kind(left, &key.left_column)?,
            infer_kind(right, &key.right_column)?,
        );
        left_cols.push((key.left_column.as_str(), repr));
        right_cols.push((key.right_column.as_str(), repr));
    }
    let left_keys = composite_keys(left, &step.left_table, &left_cols)?;
    let right_keys = composite_keys(right, &step.right_table, &right_cols)?;

    let mut right_index: HashMap<&[Option<String>], Vec<usize>> = HashMap::new();
    for (row, key) in right_keys.iter().enumerate() {
        right_index.entry(key.as_slice()).or_default().push(row);
    }
    let matched_left: Vec<bool> = left_keys
        .iter()
        .map(|key| right_index.contains_key(key.as_slice()))
        .collect();

    let pairs = match step.join_type.base() {
        JoinType::Left => {
            let mut pairs = Vec::with_capacity(left.height());
            for (row, key) in left_keys.iter().enumerate() {
                match right_index.get(key.as_slice()) {
                    Some(matches) => {
                        pairs.extend(matches.iter().map(|&other| (Some(row), Some(other))));
                    }
                    None => pairs.push((Some(row), None)),
                }
            }
            pairs
        }
        JoinType::Inner => {
            let mut pairs = Vec::new();
            for (row, key) in left_keys.iter().enumerate() {
                if let Some(matches) = right_index.get(key.as_slice()) {
                    pairs.extend(matches.iter().map(|&other| (Some(row), Some(other))));
                }
            }
            pairs
        }
        JoinType::Right => {
            let mut left_index: HashMap<&[Option<String>], Vec<usize>> = HashMap::new();
            for (row, key) in left_keys.iter().enumerate() {
                left_index.entry(key.as_slice()).or_default().push(row);
            }
            let mut pairs = Vec::with_capacity(right.height());
            for (other, key) in right_keys.iter().enumerate() {
                match left_index.get(key.as_slice()) {
                    Some(matches) => {
                        pairs.extend(matches.iter().map(|&row| (Some(row), Some(other))));
                    }
                    None => pairs.push((None, Some(other))),
                }
            }
            pairs
        }
        JoinType::Outer => {
            let mut matched_right = vec![false; right.height()];
            let mut pairs = Vec::with_capacity(left.height());
            for (row, key) in left_keys.iter().enumerate() {
                match right_index.get(key.as_slice()) {
                    Some(matches) => {
                        for &other in matches {
                            matched_right[other] = true;
                            pairs.push((Some(row), Some(other)));
                        }
                    }
                    None => pairs.push((Some(row), None)),
                }
            }
            for (other, matched) in matched_right.iter().enumerate() {
                if !matched {
                    pairs.push((None, Some(other)));
                }
            }
            pairs
        }
        // `base()` never returns an anti variant.
        _ => unreachable!("anti join types have a non-anti base"),
    };

    let surviving: Vec<(Option<usize>, Option<usize>)> = if step.join_type.is_anti() {
        pairs
            .into_iter()
            .filter(|(_, other)| other.is_none())
            .collect()
    } else {
        pairs
    };

    record_lost(left, &matched_left, step.join_type.is_anti(), lost)?;
    build_output(left, right, step, &surviving)
}

/// Record this step's lost root ids: unmatched left rows for plain joins,
/// matched left rows for anti joins. Left and outer steps keep unmatched
/// rows in the surviving frame, yet those rows still feed the residual.
fn record_lost(
    left: &DataFrame,
    matched_left: &[bool],
    anti: bool,
    lost: &mut BTreeSet<i64>,
) -> Result<()> {
    let ids = column_cells(left, ROOT_ID)?;
    for (cell, matched) in ids.iter().zip(matched_left) {
        if *matched == anti
            && let Some(id) = cell_to_i64(cell)
        {
            lost.insert(id);
        }
    }
    Ok(())
}

fn build_output(
    left: &DataFrame,
    right: &DataFrame,
    step: &JoinSpec,
    pairs: &[(Option<usize>, Option<usize>)],
) -> Result<DataFrame> {
    // Right key columns named like their left partner collapse into the left
    // column, filled from the right side for right-only rows.
    let mut collapsed: HashMap<&str, &str> = HashMap::new();
    for key in &step.on_cols {
        if key.left_column == key.right_column {
            collapsed.insert(key.left_column.as_str(), key.right_column.as_str());
        }
    }

    let left_names: Vec<String> = left
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let right_names: Vec<String> = right
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut columns = Vec::with_capacity(left_names.len() + right_names.len());
    for name in &left_names {
        let source = column_cells(left, name)?;
        let fill = collapsed
            .get(name.as_str())
            .map(|right_name| column_cells(right, right_name))
            .transpose()?;
        let cells: Vec<Cell> = pairs
            .iter()
            .map(|(row, other)| match (row, other, &fill) {
                (Some(row), _, _) => source[*row].clone(),
                (None, Some(other), Some(fill)) => fill[*other].clone(),
                _ => Cell::Null,
            })
            .collect();
        columns.push(series_from_cells(name, &cells).into());
    }

    let collapsed_right: BTreeSet<&str> = collapsed.values().copied().collect();
    for name in &right_names {
        if collapsed_right.contains(name.as_str()) {
            continue;
        }
        let source = column_cells(right, name)?;
        let cells: Vec<Cell> = pairs
            .iter()
            .map(|(_, other)| other.map_or(Cell::Null, |other| source[other].clone()))
            .collect();
        let out_name = if left_names.iter().any(|left_name| left_name == name) {
            format!("{name}_{}", step.right_table)
        } else {
            name.clone()
        };
        columns.push(series_from_cells(&out_name, &cells).into());
    }

    Ok(DataFrame::new(columns)?)
}
