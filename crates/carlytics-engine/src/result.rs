//! Run and check result types.

use datafusion::arrow::datatypes::DataType;
use serde::Serialize;
use uuid::Uuid;

use crate::catalogue::ReportName;

/// Timing and size of one report within a run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub name: ReportName,
    pub rows: usize,
    pub compute_secs: f64,
    pub write_secs: f64,
}

/// Result of a completed pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub pipeline: String,
    pub records_loaded: u64,
    /// Records that passed the required-field check.
    pub records_kept: u64,
    pub records_dropped: u64,
    pub reports: Vec<ReportOutcome>,
    pub duration_secs: f64,
}

impl PipelineResult {
    pub fn report(&self, name: ReportName) -> Option<&ReportOutcome> {
        self.reports.iter().find(|r| r.name == name)
    }
}

/// Result of checking a pipeline's source without running it.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Header columns with their inferred types.
    pub columns: Vec<(String, DataType)>,
    /// Reports whose optional columns are absent from the source; a run
    /// would fail when it reaches the first of them.
    pub unavailable_reports: Vec<(ReportName, Vec<String>)>,
}

impl CheckResult {
    pub fn is_complete(&self) -> bool {
        self.unavailable_reports.is_empty()
    }
}
