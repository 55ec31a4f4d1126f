//! Destination seam for computed reports.

use std::collections::HashMap;

use crate::catalogue::{ReportName, ReportTable};
use crate::errors::SinkError;

/// Persists report tables under their report names with overwrite semantics.
///
/// The orchestrator calls [`write_report`](Self::write_report) once per report
/// in catalogue order, then exactly one of [`finish`](Self::finish) (every
/// report written) or [`abort`](Self::abort) (the run failed).
#[allow(async_fn_in_trait)]
pub trait ReportSink {
    /// Replace the table named after `table.name` with `table`'s rows.
    async fn write_report(&mut self, table: &ReportTable) -> Result<(), SinkError>;

    async fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps the latest table per report in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: HashMap<ReportName, ReportTable>,
    writes: usize,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: ReportName) -> Option<&ReportTable> {
        self.tables.get(&name)
    }

    /// Stored tables in catalogue order.
    pub fn tables(&self) -> impl Iterator<Item = &ReportTable> {
        ReportName::ALL
            .into_iter()
            .filter_map(|name| self.tables.get(&name))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total `write_report` calls across runs.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ReportSink for MemorySink {
    async fn write_report(&mut self, table: &ReportTable) -> Result<(), SinkError> {
        self.tables.insert(table.name, table.clone());
        self.writes += 1;
        self.finished = false;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}
