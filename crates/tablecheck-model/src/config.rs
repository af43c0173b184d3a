//! Checklist configuration types.
//!
//! A checklist bundles everything one validation run needs: the sheets it
//! reads (with their column operations), an ordered chain of join steps, and
//! an ordered sequence of conditions and group markers. Configurations are
//! produced by an external editing surface and persisted as JSON; they are
//! immutable inputs to a run.

use serde::{Deserialize, Serialize};

/// A loosely typed scalar operand as it appears in persisted configurations.
///
/// Condition and column-operation operands arrive as JSON strings, numbers,
/// booleans, or nulls depending on how the configuration was edited, so the
/// engine re-interprets them against the target column's kind at compile
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    Number(f64),
    Bool(bool),
    #[default]
    Null,
}

impl ConfigValue {
    /// True when there is no usable operand: null, or a blank string.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::Number(_) | Self::Bool(_) => false,
        }
    }

    /// The operand's string form, if any. Whole numbers render without a
    /// trailing `.0` so `5` and `5.0` produce the same literal.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(text) => Some(text.clone()),
            Self::Number(value) => {
                if value.fract() == 0.0 && value.is_finite() {
                    Some(format!("{}", *value as i64))
                } else {
                    Some(value.to_string())
                }
            }
            Self::Bool(value) => Some(value.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse::<f64>().ok(),
            Self::Bool(_) | Self::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(value) => {
                if value.fract() == 0.0 && value.is_finite() {
                    Some(*value as i64)
                } else {
                    None
                }
            }
            Self::Text(text) => text.trim().parse::<i64>().ok(),
            Self::Bool(_) | Self::Null => None,
        }
    }
}

/// AND/OR combinator used both per-condition and on group markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND", alias = "and", alias = "And")]
    And,
    #[serde(rename = "OR", alias = "or", alias = "Or")]
    Or,
}

/// Join flavor for one step of the chain.
///
/// The `a_*` spellings are accepted for compatibility with configurations
/// persisted by earlier releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Left,
    Right,
    Inner,
    Outer,
    #[serde(alias = "a_left")]
    AntiLeft,
    #[serde(alias = "a_right")]
    AntiRight,
    #[serde(alias = "a_inner")]
    AntiInner,
}

impl JoinType {
    /// True for the anti-join variants.
    pub fn is_anti(self) -> bool {
        matches!(self, Self::AntiLeft | Self::AntiRight | Self::AntiInner)
    }

    /// The base join type the physical merge uses (`anti_*` stripped).
    pub fn base(self) -> Self {
        match self {
            Self::AntiLeft => Self::Left,
            Self::AntiRight => Self::Right,
            Self::AntiInner => Self::Inner,
            other => other,
        }
    }
}

/// One left/right column pairing for a join step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKey {
    pub left_column: String,
    pub right_column: String,
}

/// One step in the ordered join chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub left_table: String,
    pub right_table: String,
    pub join_type: JoinType,
    pub on_cols: Vec<JoinKey>,
}

/// Declarative column transform applied to a sheet before joining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOperation {
    pub column: String,
    pub operator: ColumnOperator,
    #[serde(default)]
    pub value_1: ConfigValue,
    #[serde(default)]
    pub value_2: ConfigValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOperator {
    Merge,
    Split,
    GetCharacter,
}

/// Row-wise comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equals,
    NotEquals,
    ColumnEquals,
    ColumnNotEquals,
    LengthEquals,
    LengthNotEquals,
    GreaterThan,
    LessThan,
    GreaterThanEqual,
    LessThanEqual,
    Between,
    StartsWith,
    EndsWith,
    IsNull,
    NotNull,
    Contains,
    NotContains,
    InList,
    NotInList,
    InColumnList,
    NotInColumnList,
    HasParent,
    HasNoParent,
    WildcardMatch,
    WildcardNotMatch,
    DistinctCombinations,
    NonDistinctCombinations,
}

/// One declarative predicate over the joined dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: CompareOp,
    #[serde(default)]
    pub value_1: ConfigValue,
    #[serde(default)]
    pub value_2: ConfigValue,
    /// 1-based character position applied to the row value before testing.
    #[serde(default)]
    pub column_char: ConfigValue,
    /// How this condition combines into the current group.
    #[serde(default)]
    pub logic: Logic,
}

/// Closes the current logical group and opens the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMarker {
    pub nested_logic: Logic,
}

/// Entry in the ordered `conditions` sequence: either a group marker or a
/// condition. Markers are distinguished by their `nested_logic` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionEntry {
    Group(GroupMarker),
    Predicate(Condition),
}

/// A sheet selected for the run, with its column operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSelection {
    pub name: String,
    #[serde(default)]
    pub col_operations: Vec<ColumnOperation>,
}

/// The full persisted configuration for one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistConfig {
    pub sheets: Vec<SheetSelection>,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    #[serde(default)]
    pub conditions: Vec<ConditionEntry>,
}
