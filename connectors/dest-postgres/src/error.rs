//! Classification of PostgreSQL failures into [`SinkError`] variants.

use carlytics_engine::SinkError;

/// Render a driver error with SQLSTATE details when the server sent any.
pub(crate) fn format_pg_error(prefix: &str, error: &tokio_postgres::Error) -> String {
    if let Some(db_error) = error.as_db_error() {
        let detail = db_error.detail().unwrap_or("n/a");
        let hint = db_error.hint().unwrap_or("n/a");
        format!(
            "{prefix}: {} (sqlstate={} severity={} detail={} hint={})",
            db_error.message(),
            db_error.code().code(),
            db_error.severity(),
            detail,
            hint
        )
    } else {
        format!("{prefix}: {error}")
    }
}

/// Classify a failed statement against `table`.
pub(crate) fn classify(table: &str, prefix: &str, error: &tokio_postgres::Error) -> SinkError {
    let code = error.as_db_error().map(|db| db.code().code());
    classify_code(table, code, error.is_closed(), format_pg_error(prefix, error))
}

/// SQLSTATE class 28 is authorization, 42 and 22 are schema or data
/// incompatibility. No server error at all means the connection is gone.
pub(crate) fn classify_code(
    table: &str,
    sqlstate: Option<&str>,
    closed: bool,
    message: String,
) -> SinkError {
    match sqlstate {
        _ if closed => SinkError::Connection(message),
        None => SinkError::Connection(message),
        Some(code) if code.starts_with("28") => SinkError::Auth(message),
        Some(code) if code.starts_with("42") || code.starts_with("22") => SinkError::Schema {
            table: table.to_string(),
            message,
        },
        Some(_) => SinkError::Write {
            table: table.to_string(),
            message,
        },
    }
}
