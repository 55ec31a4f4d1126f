//! DDL: schema and table creation, staging swaps.

mod staging;
mod type_map;

use pg_escape::quote_identifier;
use tokio_postgres::Client;

use carlytics_engine::SinkError;
use datafusion::arrow::datatypes::Schema;

use crate::error::classify;

use self::type_map::arrow_to_pg_type;

pub(crate) use self::staging::{
    drop_staging_table, prepare_staging, qualified, swap_staging_tables,
};

/// `CREATE TABLE` for a report table. `report` names the report in errors.
pub(crate) fn create_table_sql(
    report: &str,
    qualified_table: &str,
    arrow_schema: &Schema,
) -> Result<String, SinkError> {
    let columns_ddl = arrow_schema
        .fields()
        .iter()
        .map(|field| {
            let pg_type = arrow_to_pg_type(field.data_type()).ok_or_else(|| SinkError::Schema {
                table: report.to_string(),
                message: format!(
                    "column '{}' has unsupported type {}",
                    field.name(),
                    field.data_type()
                ),
            })?;
            let nullable = if field.is_nullable() { "" } else { " NOT NULL" };
            Ok(format!("{} {}{}", quote_identifier(field.name()), pg_type, nullable))
        })
        .collect::<Result<Vec<_>, SinkError>>()?;

    Ok(format!(
        "CREATE TABLE {} ({})",
        qualified_table,
        columns_ddl.join(", ")
    ))
}

pub(crate) async fn ensure_schema(client: &Client, schema: &str) -> Result<(), SinkError> {
    let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_identifier(schema));
    client
        .execute(&sql, &[])
        .await
        .map_err(|e| classify(schema, &format!("Failed to create schema '{schema}'"), &e))?;
    Ok(())
}

/// Create `table` in `schema` with columns matching `arrow_schema`.
pub(crate) async fn create_table(
    client: &Client,
    report: &str,
    schema: &str,
    table: &str,
    arrow_schema: &Schema,
) -> Result<(), SinkError> {
    let qualified_table = qualified(schema, table);
    let sql = create_table_sql(report, &qualified_table, arrow_schema)?;
    client
        .execute(&sql, &[])
        .await
        .map_err(|e| classify(report, &format!("Failed to create table {qualified_table}"), &e))?;
    tracing::debug!(table = %qualified_table, "Created table");
    Ok(())
}
