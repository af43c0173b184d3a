//! Data definitions shared across the tablecheck workspace: the persisted
//! checklist configuration, list-source references, and the run-log record
//! shape. The engine itself lives in `tablecheck-engine`.

pub mod config;
pub mod run;
pub mod source;

pub use config::{
    ChecklistConfig, ColumnOperation, ColumnOperator, CompareOp, Condition, ConditionEntry,
    ConfigValue, GroupMarker, JoinKey, JoinSpec, JoinType, Logic, SheetSelection,
};
pub use run::RunRecord;
pub use source::{InvalidListSource, ListSourceKind, ListSourceRef};
