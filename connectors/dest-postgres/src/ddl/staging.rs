//! Staging table lifecycle for overwrite writes.

use pg_escape::quote_identifier;
use tokio_postgres::Client;

use carlytics_engine::SinkError;

use crate::error::classify;

const STAGING_SUFFIX: &str = "__cl_staging";

pub(crate) fn staging_name(table: &str) -> String {
    format!("{table}{STAGING_SUFFIX}")
}

pub(crate) fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

/// Statements that replace `table` with its staging table. Must run inside
/// a transaction.
pub(crate) fn swap_statements(schema: &str, table: &str) -> [String; 2] {
    [
        format!("DROP TABLE IF EXISTS {} CASCADE", qualified(schema, table)),
        format!(
            "ALTER TABLE {} RENAME TO {}",
            qualified(schema, &staging_name(table)),
            quote_identifier(table)
        ),
    ]
}

/// Drop the staging table for `table` if it exists.
pub(crate) async fn drop_staging_table(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<(), SinkError> {
    let staging = qualified(schema, &staging_name(table));
    let sql = format!("DROP TABLE IF EXISTS {staging} CASCADE");
    client
        .execute(&sql, &[])
        .await
        .map_err(|e| classify(table, &format!("DROP staging table failed for {staging}"), &e))?;
    tracing::debug!(table = %staging, "Dropped staging table");
    Ok(())
}

/// Drop any leftover staging table and return the fresh staging name.
pub(crate) async fn prepare_staging(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<String, SinkError> {
    drop_staging_table(client, schema, table).await?;
    Ok(staging_name(table))
}

/// Atomically swap the staging tables of every name in `tables` into place.
///
/// Either all targets are replaced or, on error, none are.
pub(crate) async fn swap_staging_tables(
    client: &Client,
    schema: &str,
    tables: &[&str],
) -> Result<(), SinkError> {
    let first = tables.first().copied().unwrap_or_default();
    client
        .execute("BEGIN", &[])
        .await
        .map_err(|e| classify(first, "Swap BEGIN failed", &e))?;

    for table in tables {
        for sql in swap_statements(schema, table) {
            if let Err(e) = client.execute(&sql, &[]).await {
                let _ = client.execute("ROLLBACK", &[]).await;
                return Err(classify(table, &format!("Swap failed for {table}"), &e));
            }
        }
    }

    client
        .execute("COMMIT", &[])
        .await
        .map_err(|e| classify(first, "Swap COMMIT failed", &e))?;

    tracing::info!(schema, tables = tables.len(), "Staging tables swapped into place");
    Ok(())
}
