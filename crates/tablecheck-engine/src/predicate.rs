//! Typed row predicates compiled from declarative conditions.
//!
//! Each operator compiles to one enum variant holding typed operands, and
//! the variant evaluates directly over columns. Compilation checks the
//! operator's argument shape up front; a condition that does not fit its
//! column (unknown column, unparseable numeric, bad position) is skipped
//! with a warning instead of aborting the run.
//!
//! Negated operators evaluate their positive counterpart and complement the
//! mask, so a `not_*` condition flags the rows its partner leaves alone,
//! null rows included.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use regex::{Regex, RegexBuilder};

use tablecheck_model::{CompareOp, Condition, ConfigValue};

use crate::context::RunContext;
use crate::error::ConditionError;
use crate::frame_utils::{Cell, cell_to_f64, cell_to_i64, cell_to_string, column_cells, has_column};
use crate::kind::{ColumnKind, infer_kind, parse_datetime};
use crate::list_source::resolve_values;

/// A literal operand typed against the target column's inferred kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    DateTime(NaiveDateTime),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

/// Value set of a membership test.
#[derive(Debug, Clone, PartialEq)]
pub enum ListValues {
    Numbers(Vec<f64>),
    Texts(BTreeSet<String>),
}

/// One compiled condition, ready to evaluate over the joined frame.
#[derive(Debug, Clone)]
pub enum Predicate {
    Compare {
        column: String,
        op: CmpKind,
        literal: Literal,
        negate: bool,
    },
    Between {
        column: String,
        low: Literal,
        high: Literal,
    },
    StartsWith {
        column: String,
        prefix: String,
    },
    EndsWith {
        column: String,
        suffix: String,
    },
    ContainsSubstring {
        column: String,
        needle_lower: String,
        negate: bool,
    },
    /// Substring required at an exact 1-based offset, case sensitive.
    ContainsAt {
        column: String,
        needle: String,
        position: usize,
        negate: bool,
    },
    Null {
        column: String,
        negate: bool,
    },
    InList {
        column: String,
        values: ListValues,
        /// 1-based character of the row value tested instead of the whole.
        row_char: Option<usize>,
        negate: bool,
    },
    /// Membership in the comma-split tokens of another column, per row.
    InColumnList {
        column: String,
        list_column: String,
        negate: bool,
    },
    ColumnCompare {
        column: String,
        other: String,
        column_char: Option<usize>,
        other_char: Option<usize>,
        negate: bool,
    },
    Wildcard {
        column: String,
        pattern: Regex,
        negate: bool,
    },
    HasParent {
        column: String,
        negate: bool,
    },
    DistinctCombinations {
        column: String,
        companion: String,
        negate: bool,
    },
    LengthEquals {
        column: String,
        length_column: String,
        negate: bool,
    },
}

type CompileResult = Result<Predicate, ConditionError>;

/// Compile one condition against the frame it will run over.
pub fn compile(
    cond: &Condition,
    df: &DataFrame,
    ctx: &RunContext,
    guard: &mut BTreeSet<String>,
) -> CompileResult {
    let column = cond.column.clone();
    if !has_column(df, &column) {
        return Err(ConditionError::Skip(format!(
            "column '{column}' does not exist"
        )));
    }

    match cond.operator {
        CompareOp::Equals | CompareOp::NotEquals => compile_compare(
            cond,
            df,
            CmpKind::Eq,
            cond.operator == CompareOp::NotEquals,
        ),
        CompareOp::GreaterThan => compile_compare(cond, df, CmpKind::Gt, false),
        CompareOp::LessThan => compile_compare(cond, df, CmpKind::Lt, false),
        CompareOp::GreaterThanEqual => compile_compare(cond, df, CmpKind::Ge, false),
        CompareOp::LessThanEqual => compile_compare(cond, df, CmpKind::Le, false),
        CompareOp::Between => {
            let kind = infer_kind(df, &column)?;
            let low = typed_literal(&cond.value_1, kind, &column)?;
            let high = typed_literal(&cond.value_2, kind, &column)?;
            Ok(Predicate::Between { column, low, high })
        }
        CompareOp::StartsWith => Ok(Predicate::StartsWith {
            column,
            prefix: required_text(&cond.value_1)?,
        }),
        CompareOp::EndsWith => Ok(Predicate::EndsWith {
            column,
            suffix: required_text(&cond.value_1)?,
        }),
        CompareOp::Contains | CompareOp::NotContains => {
            let negate = cond.operator == CompareOp::NotContains;
            let needle = required_text(&cond.value_1)?;
            if cond.value_2.is_empty() {
                Ok(Predicate::ContainsSubstring {
                    column,
                    needle_lower: needle.to_lowercase(),
                    negate,
                })
            } else {
                let position = required_position(&cond.value_2, "contains offset")?;
                Ok(Predicate::ContainsAt {
                    column,
                    needle,
                    position,
                    negate,
                })
            }
        }
        CompareOp::IsNull | CompareOp::NotNull => Ok(Predicate::Null {
            column,
            negate: cond.operator == CompareOp::NotNull,
        }),
        CompareOp::InList | CompareOp::NotInList => {
            compile_in_list(cond, df, ctx, guard)
        }
        CompareOp::InColumnList | CompareOp::NotInColumnList => {
            let list_column = required_text(&cond.value_1)?;
            if !has_column(df, &list_column) {
                return Err(ConditionError::Skip(format!(
                    "column '{list_column}' does not exist"
                )));
            }
            Ok(Predicate::InColumnList {
                column,
                list_column,
                negate: cond.operator == CompareOp::NotInColumnList,
            })
        }
        CompareOp::ColumnEquals | CompareOp::ColumnNotEquals => {
            let other = required_text(&cond.value_1)?;
            if !has_column(df, &other) {
                return Err(ConditionError::Skip(format!(
                    "column '{other}' does not exist"
                )));
            }
            Ok(Predicate::ColumnCompare {
                column,
                other,
                column_char: optional_position(&cond.column_char, "character position")?,
                other_char: optional_position(&cond.value_2, "character position")?,
                negate: cond.operator == CompareOp::ColumnNotEquals,
            })
        }
        CompareOp::WildcardMatch | CompareOp::WildcardNotMatch => {
            let glob = required_text(&cond.value_1)?;
            let offset = optional_position(&cond.value_2, "wildcard offset")?;
            let pattern = glob_to_regex(&glob, offset)?;
            Ok(Predicate::Wildcard {
                column,
                pattern,
                negate: cond.operator == CompareOp::WildcardNotMatch,
            })
        }
        CompareOp::HasParent | CompareOp::HasNoParent => Ok(Predicate::HasParent {
            column,
            negate: cond.operator == CompareOp::HasNoParent,
        }),
        CompareOp::DistinctCombinations | CompareOp::NonDistinctCombinations => {
            let companion = required_text(&cond.value_1)?;
            if !has_column(df, &companion) {
                return Err(ConditionError::Skip(format!(
                    "column '{companion}' does not exist"
                )));
            }
            Ok(Predicate::DistinctCombinations {
                column,
                companion,
                negate: cond.operator == CompareOp::NonDistinctCombinations,
            })
        }
        CompareOp::LengthEquals | CompareOp::LengthNotEquals => {
            let length_column = required_text(&cond.value_1)?;
            if !has_column(df, &length_column) {
                return Err(ConditionError::Skip(format!(
                    "column '{length_column}' does not exist"
                )));
            }
            Ok(Predicate::LengthEquals {
                column,
                length_column,
                negate: cond.operator == CompareOp::LengthNotEquals,
            })
        }
    }
}

fn compile_compare(cond: &Condition, df: &DataFrame, op: CmpKind, negate: bool) -> CompileResult {
    let kind = infer_kind(df, &cond.column)?;
    let literal = typed_literal(&cond.value_1, kind, &cond.column)?;
    Ok(Predicate::Compare {
        column: cond.column.clone(),
        op,
        literal,
        negate,
    })
}

fn compile_in_list(
    cond: &Condition,
    df: &DataFrame,
    ctx: &RunContext,
    guard: &mut BTreeSet<String>,
) -> CompileResult {
    let raw = required_text(&cond.value_1)?;
    let mut values = resolve_values(&raw, ctx, guard)?;
    let kind = infer_kind(df, &cond.column)?;

    let values = if kind.is_numeric() {
        let mut numbers = Vec::with_capacity(values.len());
        for value in &values {
            let Ok(number) = value.trim().parse::<f64>() else {
                return Err(ConditionError::Skip(format!(
                    "invalid numeric list value '{value}' for column '{}'",
                    cond.column
                )));
            };
            numbers.push(number);
        }
        ListValues::Numbers(numbers)
    } else {
        // An offset in value_2 reduces every list value to the character at
        // that position; values too short to have one are dropped.
        if let Some(position) = optional_position(&cond.value_2, "character position")? {
            values = values
                .iter()
                .filter_map(|value| {
                    value.chars().nth(position - 1).map(|ch| ch.to_string())
                })
                .collect();
        }
        ListValues::Texts(values.into_iter().collect())
    };

    Ok(Predicate::InList {
        column: cond.column.clone(),
        values,
        row_char: optional_position(&cond.column_char, "character position")?,
        negate: cond.operator == CompareOp::NotInList,
    })
}

fn required_text(value: &ConfigValue) -> Result<String, ConditionError> {
    value
        .to_text()
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ConditionError::Skip("missing condition value".to_string()))
}

fn optional_position(value: &ConfigValue, what: &str) -> Result<Option<usize>, ConditionError> {
    if value.is_empty() {
        return Ok(None);
    }
    match value.as_i64() {
        Some(position) if position > 0 => Ok(Some(position as usize)),
        _ => Err(ConditionError::Skip(format!(
            "invalid {what} {:?}",
            value.to_text().unwrap_or_default()
        ))),
    }
}

fn required_position(value: &ConfigValue, what: &str) -> Result<usize, ConditionError> {
    optional_position(value, what)?
        .ok_or_else(|| ConditionError::Skip(format!("missing {what}")))
}

fn typed_literal(
    value: &ConfigValue,
    kind: ColumnKind,
    column: &str,
) -> Result<Literal, ConditionError> {
    let text = required_text(value)?;
    if kind.is_numeric() {
        return match value.as_f64() {
            Some(number) => Ok(Literal::Number(number)),
            None => Err(ConditionError::Skip(format!(
                "invalid numeric value '{text}' for column '{column}'"
            ))),
        };
    }
    if kind == ColumnKind::Datetime {
        return match parse_datetime(&text) {
            Some(moment) => Ok(Literal::DateTime(moment)),
            None => Err(ConditionError::Skip(format!(
                "invalid datetime value '{text}' for column '{column}'"
            ))),
        };
    }
    Ok(Literal::Text(text))
}

/// Translate a `*` / `?` glob into an anchored case-insensitive regex. An
/// offset of `n` requires the match to start after `n - 1` characters.
fn glob_to_regex(glob: &str, offset: Option<usize>) -> Result<Regex, ConditionError> {
    let mut pattern = String::from("^");
    if let Some(position) = offset {
        pattern.push_str(&format!(".{{{}}}", position - 1));
    }
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|err| ConditionError::Skip(format!("invalid wildcard pattern: {err}")))
}

impl Predicate {
    /// Evaluate into one boolean per row of `df`.
    pub fn evaluate(&self, df: &DataFrame) -> Result<Vec<bool>, ConditionError> {
        match self {
            Self::Compare {
                column,
                op,
                literal,
                negate,
            } => {
                let base = eval_compare(df, column, *op, literal)?;
                Ok(apply_negate(base, *negate))
            }
            Self::Between { column, low, high } => {
                let lower = eval_compare(df, column, CmpKind::Ge, low)?;
                let upper = eval_compare(df, column, CmpKind::Le, high)?;
                Ok(lower
                    .into_iter()
                    .zip(upper)
                    .map(|(a, b)| a && b)
                    .collect())
            }
            Self::StartsWith { column, prefix } => {
                per_cell(df, column, |cell| match cell {
                    Cell::Null => false,
                    other => cell_to_string(other).starts_with(prefix),
                })
            }
            Self::EndsWith { column, suffix } => per_cell(df, column, |cell| match cell {
                Cell::Null => false,
                other => cell_to_string(other).ends_with(suffix),
            }),
            Self::ContainsSubstring {
                column,
                needle_lower,
                negate,
            } => {
                let base = per_cell(df, column, |cell| match cell {
                    Cell::Null => false,
                    other => cell_to_string(other).to_lowercase().contains(needle_lower),
                })?;
                Ok(apply_negate(base, *negate))
            }
            Self::ContainsAt {
                column,
                needle,
                position,
                negate,
            } => {
                let start = position - 1;
                let base = per_cell(df, column, |cell| match cell {
                    Cell::Null => false,
                    other => {
                        let slice: String = cell_to_string(other)
                            .chars()
                            .skip(start)
                            .take(needle.chars().count())
                            .collect();
                        !slice.is_empty() && slice == *needle
                    }
                })?;
                Ok(apply_negate(base, *negate))
            }
            Self::Null { column, negate } => {
                let base = per_cell(df, column, Cell::is_blank)?;
                Ok(apply_negate(base, *negate))
            }
            Self::InList {
                column,
                values,
                row_char,
                negate,
            } => {
                let base = per_cell(df, column, |cell| match values {
                    ListValues::Numbers(numbers) => cell_to_f64(cell)
                        .is_some_and(|value| numbers.iter().any(|number| *number == value)),
                    ListValues::Texts(texts) => {
                        if matches!(cell, Cell::Null) {
                            return false;
                        }
                        let text = cell_to_string(cell);
                        match row_char {
                            Some(position) => text
                                .chars()
                                .nth(position - 1)
                                .is_some_and(|ch| texts.contains(&ch.to_string())),
                            None => texts.contains(&text),
                        }
                    }
                })?;
                Ok(apply_negate(base, *negate))
            }
            Self::InColumnList {
                column,
                list_column,
                negate,
            } => {
                let cells = column_cells(df, column)?;
                let lists = column_cells(df, list_column)?;
                let base = cells
                    .iter()
                    .zip(&lists)
                    .map(|(cell, list)| {
                        if matches!(cell, Cell::Null) || matches!(list, Cell::Null) {
                            return false;
                        }
                        let value = cell_to_string(cell);
                        cell_to_string(list)
                            .split(',')
                            .map(str::trim)
                            .any(|token| token == value)
                    })
                    .collect();
                Ok(apply_negate(base, *negate))
            }
            Self::ColumnCompare {
                column,
                other,
                column_char,
                other_char,
                negate,
            } => {
                let left = column_cells(df, column)?;
                let right = column_cells(df, other)?;
                let base = left
                    .iter()
                    .zip(&right)
                    .map(|(a, b)| {
                        if a.is_blank() || b.is_blank() {
                            return false;
                        }
                        let a = cell_to_string(a);
                        let b = cell_to_string(b);
                        let a = match column_char {
                            Some(position) => match a.chars().nth(position - 1) {
                                Some(ch) => ch.to_string(),
                                None => return false,
                            },
                            None => a,
                        };
                        let b = match other_char {
                            Some(position) => match b.chars().nth(position - 1) {
                                Some(ch) => ch.to_string(),
                                None => return false,
                            },
                            None => b,
                        };
                        a == b
                    })
                    .collect();
                Ok(apply_negate(base, *negate))
            }
            Self::Wildcard {
                column,
                pattern,
                negate,
            } => {
                let base = per_cell(df, column, |cell| match cell {
                    Cell::Null => false,
                    other => pattern.is_match(&cell_to_string(other)),
                })?;
                Ok(apply_negate(base, *negate))
            }
            Self::HasParent { column, negate } => {
                let cells = column_cells(df, column)?;
                let distinct: BTreeSet<String> = cells
                    .iter()
                    .filter(|cell| !cell.is_blank())
                    .map(|cell| cell_to_string(cell))
                    .collect();
                let base = cells
                    .iter()
                    .map(|cell| {
                        if cell.is_blank() {
                            return false;
                        }
                        has_shorter_form(&cell_to_string(cell), &distinct)
                    })
                    .collect();
                Ok(apply_negate(base, *negate))
            }
            Self::DistinctCombinations {
                column,
                companion,
                negate,
            } => {
                let keys = column_cells(df, column)?;
                let values = column_cells(df, companion)?;
                let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
                for (key, value) in keys.iter().zip(&values) {
                    groups
                        .entry(cell_to_string(key))
                        .or_default()
                        .insert(cell_to_string(value));
                }
                let base = keys
                    .iter()
                    .map(|key| groups[&cell_to_string(key)].len() > 1)
                    .collect();
                Ok(apply_negate(base, *negate))
            }
            Self::LengthEquals {
                column,
                length_column,
                negate,
            } => {
                let cells = column_cells(df, column)?;
                let lengths = column_cells(df, length_column)?;
                Ok(cells
                    .iter()
                    .zip(&lengths)
                    .map(|(cell, target)| {
                        // Rows without a parseable target length are flagged
                        // by neither side of the pair.
                        let Some(target) = cell_to_i64(target) else {
                            return false;
                        };
                        if target < 0 || matches!(cell, Cell::Null) {
                            return false;
                        }
                        let length = cell_to_string(cell).chars().count() as i64;
                        if *negate {
                            length != target
                        } else {
                            length == target
                        }
                    })
                    .collect())
            }
        }
    }
}

/// A value has a parent when truncating its last one or two characters
/// yields a different value present in the column.
fn has_shorter_form(value: &str, distinct: &BTreeSet<String>) -> bool {
    let chars: Vec<char> = value.chars().collect();
    [1usize, 2].iter().any(|&cut| {
        if chars.len() <= cut {
            return false;
        }
        let truncated: String = chars[..chars.len() - cut].iter().collect();
        truncated != value && distinct.contains(&truncated)
    })
}

fn per_cell<F>(df: &DataFrame, column: &str, test: F) -> Result<Vec<bool>, ConditionError>
where
    F: Fn(&Cell) -> bool,
{
    Ok(column_cells(df, column)?.iter().map(test).collect())
}

fn apply_negate(base: Vec<bool>, negate: bool) -> Vec<bool> {
    if negate {
        base.into_iter().map(|flag| !flag).collect()
    } else {
        base
    }
}

fn eval_compare(
    df: &DataFrame,
    column: &str,
    op: CmpKind,
    literal: &Literal,
) -> Result<Vec<bool>, ConditionError> {
    per_cell(df, column, |cell| {
        if matches!(cell, Cell::Null) {
            return false;
        }
        match literal {
            Literal::Number(target) => {
                cell_to_f64(cell).is_some_and(|value| compare(&value, target, op))
            }
            Literal::DateTime(target) => parse_datetime(&cell_to_string(cell))
                .is_some_and(|value| compare(&value, target, op)),
            Literal::Text(target) => compare(&cell_to_string(cell), target, op),
        }
    })
}

fn compare<T: PartialOrd>(value: &T, target: &T, op: CmpKind) -> bool {
    match op {
        CmpKind::Eq => value == target,
        CmpKind::Gt => value > target,
        CmpKind::Lt => value < target,
        CmpKind::Ge => value >= target,
        CmpKind::Le => value <= target,
    }
}
