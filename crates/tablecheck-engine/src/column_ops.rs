//! Declarative column transforms applied to a sheet before joining.
//!
//! A malformed or inapplicable operation never aborts the run. It is skipped
//! with a warning, matching the condition policy: the sheet simply keeps its
//! previous shape.

use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::warn;

use tablecheck_model::{ColumnOperation, ColumnOperator};

use crate::error::Result;
use crate::frame_utils::{
    Cell, cell_to_string, column_cells, column_strings, has_column, series_from_cells,
};

/// Apply one operation in place, or record a warning and leave the frame
/// untouched.
pub fn apply_operation(
    df: &mut DataFrame,
    op: &ColumnOperation,
    warnings: &mut Vec<String>,
) -> Result<()> {
    let outcome = match op.operator {
        ColumnOperator::Merge => apply_merge(df, op),
        ColumnOperator::Split => apply_split(df, op, warnings),
        ColumnOperator::GetCharacter => apply_get_character(df, op),
    };
    if let Err(reason) = outcome? {
        warn!(column = %op.column, operator = ?op.operator, %reason, "column operation skipped");
        warnings.push(format!(
            "column operation {:?} on '{}' skipped: {reason}",
            op.operator, op.column
        ));
    }
    Ok(())
}

type OpOutcome = Result<std::result::Result<(), String>>;

/// Concatenate the string forms of two columns into a new column.
fn apply_merge(df: &mut DataFrame, op: &ColumnOperation) -> OpOutcome {
    let Some(other) = op.value_1.to_text().filter(|text| !text.trim().is_empty()) else {
        return Ok(Err("merge needs a second column in value_1".to_string()));
    };
    let Some(target) = op.value_2.to_text().filter(|text| !text.trim().is_empty()) else {
        return Ok(Err("merge needs a target column in value_2".to_string()));
    };
    if !has_column(df, &op.column) {
        return Ok(Err(format!("column '{}' not found", op.column)));
    }
    if !has_column(df, &other) {
        return Ok(Err(format!("column '{other}' not found")));
    }

    let left = column_strings(df, &op.column)?;
    let right = column_strings(df, &other)?;
    let merged: Vec<Cell> = left
        .into_iter()
        .zip(right)
        .map(|(a, b)| Cell::Str(format!("{a}{b}")))
        .collect();
    df.with_column(series_from_cells(&target, &merged))?;
    Ok(Ok(()))
}

/// Split a column on a delimiter, either into named columns or into an
/// in-place list column. `value_1` is `"delim"` or `"delim:maxsplit"`.
fn apply_split(df: &mut DataFrame, op: &ColumnOperation, warnings: &mut Vec<String>) -> OpOutcome {
    let Some(raw) = op.value_1.to_text().filter(|text| !text.is_empty()) else {
        return Ok(Err("split needs a delimiter in value_1".to_string()));
    };
    if !has_column(df, &op.column) {
        return Ok(Err(format!("column '{}' not found", op.column)));
    }
    let (delimiter, max_split) = match raw.rsplit_once(':') {
        Some((head, tail)) if !head.is_empty() => match tail.trim().parse::<usize>() {
            Ok(limit) => (head.to_string(), Some(limit)),
            Err(_) => (raw.clone(), None),
        },
        _ => (raw.clone(), None),
    };
    if delimiter.is_empty() {
        return Ok(Err("split delimiter is empty".to_string()));
    }

    let rows: Vec<Vec<String>> = column_cells(df, &op.column)?
        .iter()
        .map(|cell| {
            if matches!(cell, Cell::Null) {
                return Vec::new();
            }
            let text = cell_to_string(cell);
            match max_split {
                Some(limit) => text
                    .splitn(limit + 1, &delimiter)
                    .map(str::to_string)
                    .collect(),
                None => text.split(&delimiter).map(str::to_string).collect(),
            }
        })
        .collect();

    let names: Vec<String> = op
        .value_2
        .to_text()
        .map(|text| {
            text.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if names.is_empty() {
        // In-place list column.
        let cells: Vec<Cell> = rows
            .iter()
            .map(|parts| Cell::List(Series::new("".into(), parts.clone())))
            .collect();
        df.with_column(series_from_cells(&op.column, &cells))?;
        return Ok(Ok(()));
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let names: Vec<String> = if names.len() == width {
        names
    } else {
        warnings.push(format!(
            "split on '{}' produced {width} parts but {} names were given; using default names",
            op.column,
            names.len()
        ));
        (1..=width).map(|i| format!("{}_{i}", op.column)).collect()
    };

    for (idx, name) in names.iter().enumerate() {
        let cells: Vec<Cell> = rows
            .iter()
            .map(|parts| {
                parts
                    .get(idx)
                    .map_or(Cell::Null, |part| Cell::Str(part.clone()))
            })
            .collect();
        df.with_column(series_from_cells(name, &cells))?;
    }
    Ok(Ok(()))
}

/// Extract the character at a 1-based position into a new column. Positions
/// past the end of a value yield null.
fn apply_get_character(df: &mut DataFrame, op: &ColumnOperation) -> OpOutcome {
    let Some(position) = op.value_1.as_i64().filter(|pos| *pos > 0) else {
        return Ok(Err(
            "get_character needs a positive position in value_1".to_string()
        ));
    };
    let Some(target) = op.value_2.to_text().filter(|text| !text.trim().is_empty()) else {
        return Ok(Err(
            "get_character needs a target column in value_2".to_string()
        ));
    };
    if !has_column(df, &op.column) {
        return Ok(Err(format!("column '{}' not found", op.column)));
    }

    let position = position as usize;
    let cells: Vec<Cell> = column_cells(df, &op.column)?
        .iter()
        .map(|cell| {
            if matches!(cell, Cell::Null) {
                return Cell::Null;
            }
            cell_to_string(cell)
                .chars()
                .nth(position - 1)
                .map_or(Cell::Null, |ch| Cell::Str(ch.to_string()))
        })
        .collect();
    df.with_column(series_from_cells(&target, &cells))?;
    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use polars::prelude::{AnyValue, DataFrame, NamedFrom, Series};
    use tablecheck_model::{ColumnOperation, ColumnOperator, ConfigValue};

    use super::*;
    use crate::frame_utils::{any_to_string, column_strings};

    fn frame(columns: Vec<Series>) -> DataFrame {
        DataFrame::new(columns.into_iter().map(Into::into).collect()).expect("frame")
    }

    fn op(
        column: &str,
        operator: ColumnOperator,
        value_1: ConfigValue,
        value_2: ConfigValue,
    ) -> ColumnOperation {
        ColumnOperation {
            column: column.to_string(),
            operator,
            value_1,
            value_2,
        }
    }

    #[test]
    fn merge_concatenates_string_forms() {
        let mut df = frame(vec![
            Series::new("site".into(), vec!["S1", "S2"]),
            Series::new("subject".into(), vec![Some(101i64), None]),
        ]);
        let mut warnings = Vec::new();
        apply_operation(
            &mut df,
            &op(
                "site",
                ColumnOperator::Merge,
                ConfigValue::Text("subject".into()),
                ConfigValue::Text("usubjid".into()),
            ),
            &mut warnings,
        )
        .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(
            column_strings(&df, "usubjid").unwrap(),
            vec!["S1101".to_string(), "S2".to_string()]
        );
    }

    #[test]
    fn split_into_named_columns() {
        let mut df = frame(vec![Series::new(
            "code".into(),
            vec!["A-B", "C-D"],
        )]);
        let mut warnings = Vec::new();
        apply_operation(
            &mut df,
            &op(
                "code",
                ColumnOperator::Split,
                ConfigValue::Text("-".into()),
                ConfigValue::Text("head,tail".into()),
            ),
            &mut warnings,
        )
        .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(
            column_strings(&df, "head").unwrap(),
            vec!["A".to_string(), "C".to_string()]
        );
        assert_eq!(
            column_strings(&df, "tail").unwrap(),
            vec!["B".to_string(), "D".to_string()]
        );
    }

    #[test]
    fn split_respects_max_split() {
        let mut df = frame(vec![Series::new("path".into(), vec!["a/b/c"])]);
        let mut warnings = Vec::new();
        apply_operation(
            &mut df,
            &op(
                "path",
                ColumnOperator::Split,
                ConfigValue::Text("/:1".into()),
                ConfigValue::Text("first,rest".into()),
            ),
            &mut warnings,
        )
        .unwrap();
        assert_eq!(column_strings(&df, "rest").unwrap(), vec!["b/c".to_string()]);
    }

    #[test]
    fn split_without_names_builds_list_column() {
        let mut df = frame(vec![Series::new("tags".into(), vec!["A,B,C"])]);
        let mut warnings = Vec::new();
        apply_operation(
            &mut df,
            &op(
                "tags",
                ColumnOperator::Split,
                ConfigValue::Text(",".into()),
                ConfigValue::Null,
            ),
            &mut warnings,
        )
        .unwrap();
        assert!(df.column("tags").unwrap().dtype().is_nested());
        let cells = column_cells(&df, "tags").unwrap();
        let Cell::List(parts) = &cells[0] else {
            panic!("expected a list cell, got {:?}", cells[0]);
        };
        let parts: Vec<String> = (0..parts.len())
            .map(|idx| any_to_string(parts.get(idx).unwrap_or(AnyValue::Null)))
            .collect();
        assert_eq!(parts, vec!["A", "B", "C"]);
    }

    #[test]
    fn get_character_out_of_range_is_null() {
        let mut df = frame(vec![Series::new("code".into(), vec!["AB", "C"])]);
        let mut warnings = Vec::new();
        apply_operation(
            &mut df,
            &op(
                "code",
                ColumnOperator::GetCharacter,
                ConfigValue::Number(2.0),
                ConfigValue::Text("second".into()),
            ),
            &mut warnings,
        )
        .unwrap();
        assert_eq!(
            column_strings(&df, "second").unwrap(),
            vec!["B".to_string(), String::new()]
        );
    }

    #[test]
    fn missing_column_is_skipped_with_warning() {
        let mut df = frame(vec![Series::new("a".into(), vec!["x"])]);
        let mut warnings = Vec::new();
        apply_operation(
            &mut df,
            &op(
                "absent",
                ColumnOperator::GetCharacter,
                ConfigValue::Number(1.0),
                ConfigValue::Text("out".into()),
            ),
            &mut warnings,
        )
        .unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(!has_column(&df, "out"));
    }
}
