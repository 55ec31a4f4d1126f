//! Multi-value INSERT write path.

use std::fmt::Write as _;

use pg_escape::quote_identifier;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

use carlytics_engine::SinkError;
use datafusion::arrow::datatypes::Schema;
use datafusion::arrow::record_batch::RecordBatch;

use super::typed_col::{downcast_columns, sql_param_value, SqlParamValue};
use super::INSERT_CHUNK_SIZE;
use crate::error::classify;

pub(crate) fn insert_header(qualified_table: &str, arrow_schema: &Schema) -> String {
    let col_list = arrow_schema
        .fields()
        .iter()
        .map(|f| quote_identifier(f.name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {qualified_table} ({col_list}) VALUES ")
}

/// `($1, $2), ($3, $4)` for `rows` rows of `cols` parameters each.
pub(crate) fn values_placeholders(rows: usize, cols: usize) -> String {
    let mut sql = String::with_capacity(rows * cols * 6);
    let mut param = 0;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for pos in 0..cols {
            if pos > 0 {
                sql.push_str(", ");
            }
            param += 1;
            let _ = write!(sql, "${param}");
        }
        sql.push(')');
    }
    sql
}

/// Write `batches` into `qualified_table` and return rows written.
pub(crate) async fn insert_batches(
    client: &Client,
    report: &str,
    qualified_table: &str,
    arrow_schema: &Schema,
    batches: &[RecordBatch],
) -> Result<u64, SinkError> {
    let header = insert_header(qualified_table, arrow_schema);
    let mut total_rows: u64 = 0;

    for batch in batches {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            continue;
        }
        let typed_cols = downcast_columns(batch).map_err(|message| SinkError::Schema {
            table: report.to_string(),
            message,
        })?;

        for chunk_start in (0..num_rows).step_by(INSERT_CHUNK_SIZE) {
            let chunk_end = (chunk_start + INSERT_CHUNK_SIZE).min(num_rows);
            let chunk_size = chunk_end - chunk_start;

            let mut sql = header.clone();
            sql.push_str(&values_placeholders(chunk_size, typed_cols.len()));

            let mut params: Vec<SqlParamValue<'_>> =
                Vec::with_capacity(chunk_size.saturating_mul(typed_cols.len()));
            for row_idx in chunk_start..chunk_end {
                for typed_col in &typed_cols {
                    params.push(sql_param_value(typed_col, row_idx));
                }
            }
            let param_refs: Vec<&(dyn ToSql + Sync)> =
                params.iter().map(SqlParamValue::as_tosql).collect();

            client.execute(&sql, &param_refs).await.map_err(|e| {
                classify(
                    report,
                    &format!("Multi-value INSERT failed for {report}, rows {chunk_start}-{chunk_end}"),
                    &e,
                )
            })?;

            total_rows += chunk_size as u64;
        }
    }

    tracing::debug!(table = qualified_table, rows = total_rows, "Inserted rows");
    Ok(total_rows)
}
