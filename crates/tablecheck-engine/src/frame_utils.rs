//! Row-wise frame access helpers.
//!
//! The engine reads cells through [`AnyValue`] and snapshots them into the
//! owned [`Cell`] scalar, so joined frames can be rebuilt column by column
//! with plain `Series::new` calls regardless of where the rows came from.

use polars::prelude::{
    AnyValue, BooleanChunked, DataFrame, NamedFrom, NewChunkedArray, PolarsResult, Series,
};

use crate::error::Result;

/// An owned snapshot of one cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// A nested sequence, e.g. produced by an in-place `split` operation.
    List(Series),
}

impl Cell {
    /// True for null cells and blank strings.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Str(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

pub fn cell_from_any(value: &AnyValue<'_>) -> Cell {
    match value {
        AnyValue::Null => Cell::Null,
        AnyValue::Boolean(value) => Cell::Bool(*value),
        AnyValue::Int8(value) => Cell::Int(i64::from(*value)),
        AnyValue::Int16(value) => Cell::Int(i64::from(*value)),
        AnyValue::Int32(value) => Cell::Int(i64::from(*value)),
        AnyValue::Int64(value) => Cell::Int(*value),
        AnyValue::UInt8(value) => Cell::Int(i64::from(*value)),
        AnyValue::UInt16(value) => Cell::Int(i64::from(*value)),
        AnyValue::UInt32(value) => Cell::Int(i64::from(*value)),
        AnyValue::UInt64(value) => Cell::Int(*value as i64),
        AnyValue::Float32(value) => Cell::Float(f64::from(*value)),
        AnyValue::Float64(value) => Cell::Float(*value),
        AnyValue::String(value) => Cell::Str((*value).to_string()),
        AnyValue::StringOwned(value) => Cell::Str(value.to_string()),
        AnyValue::List(series) => Cell::List(series.clone()),
        other => Cell::Str(other.to_string()),
    }
}

pub fn cell_to_string(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::Int(value) => value.to_string(),
        Cell::Float(value) => format_numeric(*value),
        Cell::Bool(value) => value.to_string(),
        Cell::Str(value) => value.clone(),
        Cell::List(series) => {
            let parts: Vec<String> = (0..series.len())
                .map(|idx| any_to_string(series.get(idx).unwrap_or(AnyValue::Null)))
                .collect();
            parts.join(",")
        }
    }
}

pub fn cell_to_f64(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Int(value) => Some(*value as f64),
        Cell::Float(value) => Some(*value),
        Cell::Str(value) => parse_f64(value),
        Cell::Null | Cell::Bool(_) | Cell::List(_) => None,
    }
}

pub fn cell_to_i64(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(value) => Some(*value),
        Cell::Float(value) => {
            if value.fract() == 0.0 && value.is_finite() {
                Some(*value as i64)
            } else {
                None
            }
        }
        Cell::Str(value) => parse_i64(value),
        Cell::Null | Cell::Bool(_) | Cell::List(_) => None,
    }
}

pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::String(value) => value.to_string(),
        AnyValue::StringOwned(value) => value.to_string(),
        AnyValue::Null => String::new(),
        _ => value.to_string(),
    }
}

pub fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub fn parse_f64(value: &str) -> Option<f64> {
    if value.trim().is_empty() {
        return None;
    }
    value.trim().parse::<f64>().ok()
}

pub fn parse_i64(value: &str) -> Option<i64> {
    if value.trim().is_empty() {
        return None;
    }
    value.trim().parse::<i64>().ok()
}

/// Snapshot a whole column into owned cells.
pub fn column_cells(df: &DataFrame, name: &str) -> Result<Vec<Cell>> {
    let column = df.column(name)?;
    Ok((0..df.height())
        .map(|idx| cell_from_any(&column.get(idx).unwrap_or(AnyValue::Null)))
        .collect())
}

/// String forms of a whole column (null cells become empty strings).
pub fn column_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    Ok(column_cells(df, name)?.iter().map(cell_to_string).collect())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Rebuild a column from cells, choosing the narrowest representation the
/// values allow: integer, float, boolean, list, otherwise string.
pub fn series_from_cells(name: &str, cells: &[Cell]) -> Series {
    if cells.iter().any(|cell| matches!(cell, Cell::List(_))) {
        let rows: Vec<Series> = cells
            .iter()
            .map(|cell| match cell {
                Cell::List(series) => series.clone(),
                Cell::Null => Series::new("".into(), Vec::<String>::new()),
                other => Series::new("".into(), vec![cell_to_string(other)]),
            })
            .collect();
        return Series::new(name.into(), rows);
    }

    let non_null = cells.iter().filter(|cell| !matches!(cell, Cell::Null));
    let mut all_int = true;
    let mut all_num = true;
    let mut all_bool = true;
    let mut any_value = false;
    for cell in non_null {
        any_value = true;
        match cell {
            Cell::Int(_) => all_bool = false,
            Cell::Float(_) => {
                all_int = false;
                all_bool = false;
            }
            Cell::Bool(_) => {
                all_int = false;
                all_num = false;
            }
            _ => {
                all_int = false;
                all_num = false;
                all_bool = false;
            }
        }
    }

    if any_value && all_int {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|cell| match cell {
                Cell::Int(value) => Some(*value),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }
    if any_value && all_num {
        let values: Vec<Option<f64>> = cells.iter().map(cell_to_f64).collect();
        return Series::new(name.into(), values);
    }
    if any_value && all_bool {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|cell| match cell {
                Cell::Bool(value) => Some(*value),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|cell| match cell {
            Cell::Null => None,
            other => Some(cell_to_string(other)),
        })
        .collect();
    Series::new(name.into(), values)
}

/// Keep the rows whose mask entry is true, preserving order and schema.
pub fn filter_rows(df: &DataFrame, mask: &[bool]) -> PolarsResult<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), mask);
    df.filter(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_format_without_trailing_zero() {
        assert_eq!(format_numeric(1.0), "1");
        assert_eq!(format_numeric(1.5), "1.5");
        assert_eq!(cell_to_string(&Cell::Float(3.0)), "3");
    }

    #[test]
    fn cells_rebuild_into_typed_series() {
        let ints = series_from_cells("a", &[Cell::Int(1), Cell::Null, Cell::Int(3)]);
        assert_eq!(ints.len(), 3);
        assert!(ints.dtype().is_integer());

        let mixed = series_from_cells("b", &[Cell::Int(1), Cell::Str("x".into())]);
        assert!(mixed.dtype().is_string());

        let floats = series_from_cells("c", &[Cell::Int(1), Cell::Float(2.5)]);
        assert!(floats.dtype().is_float());
    }

    #[test]
    fn blank_detection_covers_null_and_whitespace() {
        assert!(Cell::Null.is_blank());
        assert!(Cell::Str("   ".into()).is_blank());
        assert!(!Cell::Str("x".into()).is_blank());
        assert!(!Cell::Int(0).is_blank());
    }
}
