//! Flat two-level AND/OR grouping of conditions.
//!
//! The ordered `conditions` sequence folds into one boolean mask. Conditions
//! combine into the current group with their own `logic`; a group marker
//! folds the finished group into the final mask with the logic that opened
//! it, then starts the next group. This is not general nesting: predicates
//! group one level deep, and groups combine only at explicit markers.

use std::collections::BTreeSet;

use polars::prelude::DataFrame;
use tracing::warn;

use tablecheck_model::{ConditionEntry, Logic};

use crate::context::RunContext;
use crate::error::{ConditionError, Result};
use crate::predicate::compile;

/// Evaluate the condition sequence into one mask over `df`. Conditions that
/// fail to compile or evaluate are skipped with a warning; fatal errors
/// abort.
pub fn evaluate_conditions(
    entries: &[ConditionEntry],
    df: &DataFrame,
    ctx: &RunContext,
    guard: &mut BTreeSet<String>,
    warnings: &mut Vec<String>,
) -> Result<Vec<bool>> {
    let height = df.height();
    let mut final_mask = vec![true; height];
    let mut group_mask = vec![true; height];
    let mut group_logic = Logic::And;

    for entry in entries {
        match entry {
            ConditionEntry::Group(marker) => {
                fold(&mut final_mask, &group_mask, group_logic);
                group_mask = vec![true; height];
                group_logic = marker.nested_logic;
            }
            ConditionEntry::Predicate(cond) => {
                let mask = compile(cond, df, ctx, guard).and_then(|pred| pred.evaluate(df));
                match mask {
                    Ok(mask) => fold(&mut group_mask, &mask, cond.logic),
                    Err(ConditionError::Skip(reason)) => {
                        warn!(column = %cond.column, operator = ?cond.operator, %reason, "condition skipped");
                        warnings.push(format!(
                            "condition {:?} on '{}' skipped: {reason}",
                            cond.operator, cond.column
                        ));
                    }
                    Err(ConditionError::Fatal(err)) => return Err(err),
                }
            }
        }
    }
    fold(&mut final_mask, &group_mask, group_logic);
    Ok(final_mask)
}

fn fold(target: &mut [bool], mask: &[bool], logic: Logic) {
    for (slot, flag) in target.iter_mut().zip(mask) {
        match logic {
            Logic::And => *slot &= flag,
            Logic::Or => *slot |= flag,
        }
    }
}
