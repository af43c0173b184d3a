//! Column kind inference and join-key type resolution.
//!
//! Column kinds are inferred from observed values, never declared. Native
//! numeric and boolean dtypes map directly; string columns are content
//! scanned, so a column of `"1"`, `"2"` counts as integer. Two join-key
//! columns whose kinds fall in a compatible family are compared in that
//! family's canonical form; everything else is compared as strings.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::{DataFrame, DataType};

use crate::error::Result;
use crate::frame_utils::{Cell, cell_to_f64, cell_to_string, column_cells, format_numeric};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Datetime,
    Boolean,
    /// Non-scalar content (e.g. a list column).
    Mixed,
    /// No non-blank values to infer from.
    Empty,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

/// Infer the kind of one column.
pub fn infer_kind(df: &DataFrame, name: &str) -> Result<ColumnKind> {
    let column = df.column(name)?;
    match column.dtype() {
        dtype if dtype.is_integer() => return Ok(ColumnKind::Integer),
        dtype if dtype.is_float() => return Ok(ColumnKind::Float),
        DataType::Boolean => return Ok(ColumnKind::Boolean),
        DataType::String | DataType::Null => {}
        _ => return Ok(ColumnKind::Mixed),
    }

    let mut seen_any = false;
    let mut all_integer = true;
    let mut all_numeric = true;
    let mut all_boolean = true;
    let mut all_datetime = true;
    for cell in column_cells(df, name)? {
        if cell.is_blank() {
            continue;
        }
        seen_any = true;
        let text = cell_to_string(&cell);
        let trimmed = text.trim();
        match trimmed.parse::<f64>() {
            Ok(value) => {
                if value.fract() != 0.0 {
                    all_integer = false;
                }
            }
            Err(_) => {
                all_integer = false;
                all_numeric = false;
            }
        }
        if !matches!(trimmed.to_ascii_lowercase().as_str(), "true" | "false") {
            all_boolean = false;
        }
        if parse_datetime(trimmed).is_none() {
            all_datetime = false;
        }
    }

    if !seen_any {
        return Ok(ColumnKind::Empty);
    }
    if all_numeric {
        return Ok(if all_integer {
            ColumnKind::Integer
        } else {
            ColumnKind::Float
        });
    }
    if all_boolean {
        return Ok(ColumnKind::Boolean);
    }
    if all_datetime {
        return Ok(ColumnKind::Datetime);
    }
    Ok(ColumnKind::Text)
}

/// Parse the datetime forms the engine recognizes.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

    let trimmed = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(value);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(value) = NaiveDate::parse_from_str(trimmed, format) {
            return value.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Canonical comparison form for a resolved join-key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRepr {
    Numeric,
    Datetime,
    Text,
}

/// Decide how a key pair is compared. Integer and float are one family;
/// datetimes compare as datetimes; anything else falls back to the string
/// representation of both sides.
pub fn key_repr(left: ColumnKind, right: ColumnKind) -> KeyRepr {
    if left.is_numeric() && right.is_numeric() {
        KeyRepr::Numeric
    } else if left == ColumnKind::Datetime && right == ColumnKind::Datetime {
        KeyRepr::Datetime
    } else {
        KeyRepr::Text
    }
}

/// Canonical key string per row; `None` marks a null key. Returns `None`
/// for the whole column when it holds nested values, which no string
/// coercion can reconcile.
pub fn key_values(df: &DataFrame, name: &str, repr: KeyRepr) -> Result<Option<Vec<Option<String>>>> {
    let cells = column_cells(df, name)?;
    if cells.iter().any(|cell| matches!(cell, Cell::List(_))) {
        return Ok(None);
    }
    let keys = cells
        .iter()
        .map(|cell| {
            if matches!(cell, Cell::Null) {
                return None;
            }
            let text = cell_to_string(cell);
            match repr {
                KeyRepr::Numeric => Some(
                    cell_to_f64(cell)
                        .map(format_numeric)
                        .unwrap_or_else(|| text.trim().to_string()),
                ),
                KeyRepr::Datetime => Some(
                    parse_datetime(&text)
                        .map(|value| value.format("%Y-%m-%dT%H:%M:%S").to_string())
                        .unwrap_or(text),
                ),
                KeyRepr::Text => Some(text),
            }
        })
        .collect();
    Ok(Some(keys))
}
