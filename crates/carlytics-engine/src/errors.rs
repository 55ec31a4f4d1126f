//! Pipeline error taxonomy.
//!
//! Each stage has its own error type; [`PipelineError`] wraps them so the
//! orchestrator can fail fast with a single result type. Nothing here is
//! retryable: a run either completes or aborts at the first failure.

use std::path::PathBuf;

use datafusion::arrow::datatypes::DataType;
use datafusion::error::DataFusionError;

use crate::catalogue::ReportName;

/// The source file could not be read or does not look like a vehicle listing.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("cannot read source file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Header row is absent or lacks required fields.
    #[error("source file {} is missing required column(s): {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("failed to read source file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: DataFusionError,
    },
}

/// A derived column could not be computed from the cleaned records.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("column '{column}' must be numeric, found {data_type}")]
    NonNumeric { column: String, data_type: DataType },

    #[error("column '{column}' must be text, found {data_type}")]
    NonText { column: String, data_type: DataType },

    #[error("transform failed: {0}")]
    Engine(#[from] DataFusionError),
}

/// A report definition could not be planned or executed.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("report {report} references missing column '{column}'")]
    MissingColumn { report: ReportName, column: String },

    #[error("report {report} failed: {source}")]
    Engine {
        report: ReportName,
        #[source]
        source: DataFusionError,
    },
}

/// Writing a report to the relational sink failed.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("invalid sink configuration: {0}")]
    Config(String),

    #[error("sink connection failed: {0}")]
    Connection(String),

    #[error("sink authentication failed: {0}")]
    Auth(String),

    #[error("schema incompatible with sink table {table}: {message}")]
    Schema { table: String, message: String },

    #[error("write to sink table {table} failed: {message}")]
    Write { table: String, message: String },
}

/// Top-level error returned by a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl From<anyhow::Error> for PipelineError {
    fn from(e: anyhow::Error) -> Self {
        Self::Config(e)
    }
}

impl PipelineError {
    /// Short stage label for logs and run summaries.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Ingestion(_) => "ingestion",
            Self::Transform(_) => "transform",
            Self::Query(_) => "query",
            Self::Sink(_) => "sink",
        }
    }
}
