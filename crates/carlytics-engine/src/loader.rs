//! Delimited source file ingestion.

use datafusion::dataframe::DataFrame;
use datafusion::prelude::CsvReadOptions;

use crate::config::SourceConfig;
use crate::errors::IngestionError;
use crate::session::EngineSession;

/// Read the source file into a DataFrame with inferred column types.
///
/// The header row names the columns. Every required field in
/// `source.columns` must appear in it.
pub async fn load(
    session: &EngineSession,
    source: &SourceConfig,
) -> Result<DataFrame, IngestionError> {
    let path = &source.path;
    std::fs::File::open(path).map_err(|e| IngestionError::Unreadable {
        path: path.clone(),
        source: e,
    })?;

    // Single-file reads still go through extension filtering.
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let options = CsvReadOptions::new()
        .has_header(true)
        .delimiter(source.delimiter_byte())
        .schema_infer_max_records(source.schema_infer_max_records)
        .file_extension(&extension);

    let location = path.to_string_lossy().into_owned();
    let df = session
        .context()
        .read_csv(location, options)
        .await
        .map_err(|e| IngestionError::Read {
            path: path.clone(),
            source: e,
        })?;

    let missing: Vec<String> = source
        .columns
        .required()
        .into_iter()
        .filter(|name| !df.schema().has_column_with_unqualified_name(name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(IngestionError::MissingColumns {
            path: path.clone(),
            columns: missing,
        });
    }

    tracing::debug!(
        path = %path.display(),
        columns = df.schema().fields().len(),
        "Source loaded"
    );
    Ok(df)
}
