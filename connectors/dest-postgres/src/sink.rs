//! [`ReportSink`] implementation over a single PostgreSQL connection.

use std::time::Instant;

use tokio_postgres::Client;

use carlytics_engine::config::{Consistency, SinkConfig};
use carlytics_engine::{ReportName, ReportSink, ReportTable, SinkError};

use crate::batch::insert_batches;
use crate::client::{connect, describe_target};
use crate::ddl::{
    create_table, drop_staging_table, ensure_schema, prepare_staging, qualified,
    swap_staging_tables,
};

/// Writes each report to `<name>__cl_staging`, then swaps it over the
/// target table.
///
/// With [`Consistency::PerReport`] the swap happens right after each write,
/// so a failed run leaves earlier reports replaced and later ones untouched.
/// With [`Consistency::AllOrNothing`] swaps are deferred to
/// [`finish`](ReportSink::finish) and run in one transaction; `abort` drops
/// the staged tables and every target keeps its previous contents.
pub struct PostgresSink {
    client: Client,
    schema: String,
    consistency: Consistency,
    schema_ready: bool,
    /// Reports with a staging table that has not been swapped yet.
    staged: Vec<ReportName>,
}

impl PostgresSink {
    pub async fn connect(config: &SinkConfig) -> Result<Self, SinkError> {
        let client = connect(config).await?;
        tracing::info!(
            sink = %describe_target(config),
            schema = config.schema,
            consistency = ?config.consistency,
            "Connected to PostgreSQL sink"
        );
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &SinkConfig) -> Self {
        Self {
            client,
            schema: config.schema.clone(),
            consistency: config.consistency,
            schema_ready: false,
            staged: Vec::new(),
        }
    }

    /// Reports staged but not yet swapped into place.
    pub fn pending(&self) -> &[ReportName] {
        &self.staged
    }

    async fn swap(&mut self, names: &[ReportName]) -> Result<(), SinkError> {
        let tables: Vec<&str> = names.iter().map(ReportName::table).collect();
        swap_staging_tables(&self.client, &self.schema, &tables).await?;
        self.staged.retain(|name| !names.contains(name));
        Ok(())
    }
}

impl ReportSink for PostgresSink {
    async fn write_report(&mut self, table: &ReportTable) -> Result<(), SinkError> {
        let start = Instant::now();
        let name = table.name;
        let target = name.table();

        if !self.schema_ready {
            ensure_schema(&self.client, &self.schema).await?;
            self.schema_ready = true;
        }

        let staging = prepare_staging(&self.client, &self.schema, target).await?;
        if !self.staged.contains(&name) {
            self.staged.push(name);
        }
        create_table(&self.client, target, &self.schema, &staging, &table.schema).await?;
        let rows = insert_batches(
            &self.client,
            target,
            &qualified(&self.schema, &staging),
            &table.schema,
            &table.batches,
        )
        .await?;

        if self.consistency == Consistency::PerReport {
            self.swap(&[name]).await?;
        }

        tracing::info!(
            table = target,
            rows,
            deferred = self.consistency == Consistency::AllOrNothing,
            duration_secs = start.elapsed().as_secs_f64(),
            "Report table written"
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let names = self.staged.clone();
        self.swap(&names).await?;
        tracing::info!(tables = names.len(), "Deferred report tables committed");
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), SinkError> {
        let mut first_err = None;
        for name in std::mem::take(&mut self.staged) {
            if let Err(e) = drop_staging_table(&self.client, &self.schema, name.table()).await {
                tracing::warn!(table = name.table(), "Failed to drop staging table: {e}");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
