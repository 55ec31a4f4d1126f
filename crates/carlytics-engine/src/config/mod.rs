//! Pipeline configuration: types, YAML parsing and semantic validation.

pub mod parser;
pub mod types;
pub mod validator;

pub use types::{
    ColumnMap, Consistency, EngineOptions, PipelineConfig, SinkConfig, SinkDriver, SourceConfig,
    WriteMode,
};
pub use parser::{parse_pipeline, parse_pipeline_str};
pub use validator::{normalize_sink_url, validate_pipeline};
