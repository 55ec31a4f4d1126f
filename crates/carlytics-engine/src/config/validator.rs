//! Semantic validation for parsed pipeline configuration values.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::config::types::{ColumnMap, EngineOptions, PipelineConfig, SinkConfig};

const SUPPORTED_URL_SCHEMES: [&str; 2] = ["postgres://", "postgresql://"];

fn validate_columns(columns: &ColumnMap, errors: &mut Vec<String>) {
    let mappings = [
        ("make", &columns.make),
        ("model", &columns.model),
        ("price", &columns.price),
        ("year", &columns.year),
        ("mileage", &columns.mileage),
        ("transmission", &columns.transmission),
        ("fuel_type", &columns.fuel_type),
        ("color", &columns.color),
        ("cylinders", &columns.cylinders),
    ];
    for (field, name) in mappings {
        if name.trim().is_empty() {
            errors.push(format!("source.columns.{field} must not be empty"));
        }
    }

    let mut seen = HashSet::new();
    for name in columns.required() {
        if !seen.insert(name) {
            errors.push(format!(
                "source.columns maps more than one required field to '{name}'"
            ));
        }
    }
}

fn validate_engine(engine: &EngineOptions, errors: &mut Vec<String>) {
    if engine.target_partitions == Some(0) {
        errors.push("engine.target_partitions must be > 0".to_string());
    }
    if engine.batch_size == Some(0) {
        errors.push("engine.batch_size must be > 0".to_string());
    }
}

/// Strip an optional JDBC prefix so `jdbc:postgresql://...` URLs are accepted.
pub fn normalize_sink_url(url: &str) -> &str {
    let trimmed = url.trim();
    trimmed.strip_prefix("jdbc:").unwrap_or(trimmed)
}

fn validate_sink(sink: &SinkConfig, errors: &mut Vec<String>) {
    let url = normalize_sink_url(&sink.url);
    if url.is_empty() {
        errors.push("sink.url must not be empty".to_string());
    } else if !SUPPORTED_URL_SCHEMES
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        errors.push(format!(
            "sink.url '{url}' must use one of: {}",
            SUPPORTED_URL_SCHEMES.join(", ")
        ));
    }

    if sink.user.trim().is_empty() {
        errors.push("sink.user must not be empty".to_string());
    }
    if sink.schema.trim().is_empty() {
        errors.push("sink.schema must not be empty".to_string());
    }
}

/// Validate a parsed pipeline configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the pipeline config.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported pipeline version '{}', expected '1.0'",
            config.version
        ));
    }

    if config.pipeline.trim().is_empty() {
        errors.push("Pipeline name must not be empty".to_string());
    }

    if config.source.path.as_os_str().is_empty() {
        errors.push("source.path must not be empty".to_string());
    }

    let delimiter = config.source.delimiter.as_bytes();
    if delimiter.len() != 1 || !delimiter[0].is_ascii() {
        errors.push(format!(
            "source.delimiter must be a single ASCII character, got {:?}",
            config.source.delimiter
        ));
    }

    if config.source.schema_infer_max_records == 0 {
        errors.push("source.schema_infer_max_records must be > 0".to_string());
    }

    validate_columns(&config.source.columns, &mut errors);
    validate_engine(&config.engine, &mut errors);
    validate_sink(&config.sink, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        bail!(
            "Pipeline validation failed:\n  - {}",
            errors.join("\n  - ")
        )
    }
}
