//! External list-source references.
//!
//! Membership conditions (`in_list` / `not_in_list`) may draw their value
//! set from an external source instead of a literal comma list. Sources are
//! persisted as `"kind.source.column"` strings, where `kind` selects the
//! registry the values come from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which registry a list source reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListSourceKind {
    /// A master reference table snapshot.
    Master,
    /// A sheet from the uploaded workbook.
    Sheet,
    /// The failed rows of another checklist's run.
    Checklist,
}

impl ListSourceKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "master" => Some(Self::Master),
            "sheet" => Some(Self::Sheet),
            "checklist" => Some(Self::Checklist),
            _ => None,
        }
    }
}

/// A parsed `"kind.source.column"` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSourceRef {
    pub kind: ListSourceKind,
    pub source: String,
    pub column: String,
}

#[derive(Debug, Error)]
#[error("invalid list source reference: {0}")]
pub struct InvalidListSource(pub String);

impl ListSourceRef {
    /// Parse a serialized reference. The column part may itself contain
    /// dots, so only the first two separators are significant.
    pub fn parse(raw: &str) -> Result<Self, InvalidListSource> {
        let mut parts = raw.splitn(3, '.');
        let (Some(tag), Some(source), Some(column)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(InvalidListSource(raw.to_string()));
        };
        let kind =
            ListSourceKind::from_tag(tag).ok_or_else(|| InvalidListSource(raw.to_string()))?;
        if source.is_empty() || column.is_empty() {
            return Err(InvalidListSource(raw.to_string()));
        }
        Ok(Self {
            kind,
            source: source.to_string(),
            column: column.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_part_references() {
        let parsed = ListSourceRef::parse("master.countries.iso_code").unwrap();
        assert_eq!(parsed.kind, ListSourceKind::Master);
        assert_eq!(parsed.source, "countries");
        assert_eq!(parsed.column, "iso_code");

        let dotted = ListSourceRef::parse("sheet.Orders.amount.usd").unwrap();
        assert_eq!(dotted.column, "amount.usd");
    }

    #[test]
    fn rejects_malformed_references() {
        assert!(ListSourceRef::parse("master.countries").is_err());
        assert!(ListSourceRef::parse("bogus.countries.code").is_err());
        assert!(ListSourceRef::parse("A,B,C").is_err());
        assert!(ListSourceRef::parse("sheet..code").is_err());
    }
}
