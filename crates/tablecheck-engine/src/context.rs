//! Ambient data a run draws from.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use tablecheck_model::ChecklistConfig;

/// Everything a run can reach beyond its own configuration: the uploaded
/// sheets, master reference snapshots, and other checklists addressable as
/// list sources.
///
/// Frames are keyed by their user-facing names. `BTreeMap` keeps iteration
/// deterministic so repeated runs over the same context produce identical
/// output.
#[derive(Debug, Default, Clone)]
pub struct RunContext {
    pub sheets: BTreeMap<String, DataFrame>,
    pub masters: BTreeMap<String, DataFrame>,
    pub checklists: BTreeMap<String, ChecklistConfig>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, frame: DataFrame) -> Self {
        self.sheets.insert(name.into(), frame);
        self
    }

    pub fn with_master(mut self, name: impl Into<String>, frame: DataFrame) -> Self {
        self.masters.insert(name.into(), frame);
        self
    }

    pub fn with_checklist(mut self, name: impl Into<String>, config: ChecklistConfig) -> Self {
        self.checklists.insert(name.into(), config);
        self
    }
}
