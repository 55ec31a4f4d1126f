//! PostgreSQL client connection and validation helpers.

use tokio_postgres::{Client, Config as PgConfig, NoTls};

use carlytics_engine::config::{normalize_sink_url, SinkConfig};
use carlytics_engine::SinkError;

use crate::error::format_pg_error;

/// Build driver settings from the sink config. `user` and `password`
/// override anything embedded in the URL.
pub(crate) fn pg_config(config: &SinkConfig) -> Result<PgConfig, SinkError> {
    let mut pg: PgConfig = normalize_sink_url(&config.url)
        .parse()
        .map_err(|e| SinkError::Config(format!("invalid sink url: {e}")))?;
    pg.user(&config.user);
    if !config.password.is_empty() {
        pg.password(&config.password);
    }
    pg.application_name("carlytics");
    Ok(pg)
}

/// Connect to PostgreSQL using the provided config.
pub async fn connect(config: &SinkConfig) -> Result<Client, SinkError> {
    let pg = pg_config(config)?;
    let (client, connection) = pg.connect(NoTls).await.map_err(|e| {
        let message = format_pg_error("Connection failed", &e);
        match e.as_db_error().map(|db| db.code().code()) {
            Some(code) if code.starts_with("28") => SinkError::Auth(message),
            _ => SinkError::Connection(message),
        }
    })?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("PostgreSQL connection error: {e}");
        }
    });

    Ok(client)
}

/// Validate PostgreSQL connectivity and target schema. Returns a
/// human-readable status line.
pub async fn validate(config: &SinkConfig) -> Result<String, SinkError> {
    let client = connect(config).await?;

    client
        .query_one("SELECT 1", &[])
        .await
        .map_err(|e| SinkError::Connection(format_pg_error("Connection test failed", &e)))?;

    let schema_exists = client
        .query_opt(
            "SELECT schema_name FROM information_schema.schemata WHERE schema_name = $1",
            &[&config.schema],
        )
        .await
        .map_err(|e| SinkError::Connection(format_pg_error("Schema lookup failed", &e)))?
        .is_some();

    let target = describe_target(config);
    Ok(if schema_exists {
        format!("Connected to {target} (schema: {})", config.schema)
    } else {
        format!(
            "Connected to {target} (schema '{}' does not exist, will be created)",
            config.schema
        )
    })
}

/// `host:port/dbname` for log and status lines; never includes credentials.
pub(crate) fn describe_target(config: &SinkConfig) -> String {
    let Ok(pg) = pg_config(config) else {
        return "<invalid url>".to_string();
    };
    let host = pg
        .get_hosts()
        .first()
        .map(|h| match h {
            tokio_postgres::config::Host::Tcp(name) => name.clone(),
            #[cfg(unix)]
            tokio_postgres::config::Host::Unix(path) => path.display().to_string(),
        })
        .unwrap_or_else(|| "localhost".to_string());
    let port = pg.get_ports().first().copied().unwrap_or(5432);
    let db = pg.get_dbname().unwrap_or("postgres");
    format!("{host}:{port}/{db}")
}
