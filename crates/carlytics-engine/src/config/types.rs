use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level pipeline configuration parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub version: String,
    pub pipeline: String,
    pub source: SourceConfig,
    #[serde(default)]
    pub engine: EngineOptions,
    pub sink: SinkConfig,
}

/// Delimited source file holding the vehicle listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_schema_infer_max_records")]
    pub schema_infer_max_records: usize,
    #[serde(default)]
    pub columns: ColumnMap,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_schema_infer_max_records() -> usize {
    1000
}

impl SourceConfig {
    /// Delimiter as a single byte. Validation guarantees this is ASCII.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

/// Source header names for each field the pipeline reads.
///
/// Names are case-sensitive and used verbatim, both to read the source and
/// to name the corresponding report output columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub make: String,
    pub model: String,
    pub price: String,
    pub year: String,
    pub mileage: String,
    pub transmission: String,
    pub fuel_type: String,
    pub color: String,
    pub cylinders: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            make: "make".to_string(),
            model: "model".to_string(),
            price: "price".to_string(),
            year: "year".to_string(),
            mileage: "mileage".to_string(),
            transmission: "transmission".to_string(),
            fuel_type: "Fuel Type".to_string(),
            color: "Color".to_string(),
            cylinders: "Cylinders".to_string(),
        }
    }
}

impl ColumnMap {
    /// Fields that must be present and non-null for a record to be kept.
    pub fn required(&self) -> [&str; 5] {
        [
            &self.make,
            &self.model,
            &self.price,
            &self.year,
            &self.mileage,
        ]
    }
}

/// Execution engine tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Partitions per query; defaults to available CPUs.
    pub target_partitions: Option<usize>,
    pub batch_size: Option<usize>,
}

/// Relational sink connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub url: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub driver: SinkDriver,
    #[serde(default = "default_sink_schema")]
    pub schema: String,
    #[serde(default)]
    pub mode: WriteMode,
    #[serde(default)]
    pub consistency: Consistency,
}

fn default_sink_schema() -> String {
    "public".to_string()
}

impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("driver", &self.driver)
            .field("schema", &self.schema)
            .field("mode", &self.mode)
            .field("consistency", &self.consistency)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkDriver {
    #[default]
    Postgres,
}

/// Write mode for report tables. Only full overwrite is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    Overwrite,
}

/// How report overwrites relate to each other within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Each report replaces its table as soon as it is computed. A failure
    /// partway through leaves earlier tables from this run and later tables
    /// from the previous one.
    #[default]
    PerReport,
    /// All reports are staged and swapped into place in one transaction
    /// after the last one is written.
    AllOrNothing,
}
