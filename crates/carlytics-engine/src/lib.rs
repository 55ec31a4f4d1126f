//! Vehicle listing ETL engine: load, clean, enrich, compute the report
//! catalogue and hand each report to a sink.

pub mod catalogue;
pub mod cleaner;
pub mod config;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod result;
pub mod session;
pub mod sink;
pub mod transform;

#[cfg(test)]
mod testing;

pub use catalogue::{ReportName, ReportTable};
pub use errors::{IngestionError, PipelineError, QueryError, SinkError, TransformError};
pub use orchestrator::{check_source, run_pipeline};
pub use result::{CheckResult, PipelineResult, ReportOutcome};
pub use sink::{MemorySink, ReportSink};
