//! Execution session owned by a single pipeline run.

use datafusion::dataframe::DataFrame;
use datafusion::error::Result as DfResult;
use datafusion::execution::context::{SessionConfig, SessionContext};
use uuid::Uuid;

use crate::config::EngineOptions;

/// View holding cleaned and enriched vehicle records.
pub const VEHICLES_VIEW: &str = "vehicles";
/// [`VEHICLES_VIEW`] plus the `price_range` bucket.
pub const PRICE_RANGES_VIEW: &str = "vehicles_price_ranges";

/// DataFusion session scoped to one run.
///
/// Created at run start and handed by reference to every stage. Views
/// registered through it are deregistered when it is closed or dropped, so
/// nothing leaks into a later run.
pub struct EngineSession {
    ctx: SessionContext,
    run_id: Uuid,
    views: Vec<String>,
}

impl EngineSession {
    pub fn open(options: &EngineOptions) -> Self {
        let mut config = SessionConfig::new();
        if let Some(partitions) = options.target_partitions {
            config = config.with_target_partitions(partitions);
        }
        if let Some(batch_size) = options.batch_size {
            config = config.with_batch_size(batch_size);
        }
        let target_partitions = config.target_partitions();

        let run_id = Uuid::new_v4();
        tracing::debug!(%run_id, target_partitions, "Engine session opened");

        Self {
            ctx: SessionContext::new_with_config(config),
            run_id,
            views: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Register `df` as a named view, replacing any view of the same name.
    pub fn register_view(&mut self, name: &str, df: DataFrame) -> DfResult<()> {
        let _ = self.ctx.deregister_table(name)?;
        self.ctx.register_table(name, df.into_view())?;
        if !self.views.iter().any(|v| v == name) {
            self.views.push(name.to_string());
        }
        Ok(())
    }

    /// Execute `df` once and register the collected batches as `name`.
    ///
    /// Readers of the view see the same rows for the life of the session,
    /// whatever happens to the underlying file.
    pub async fn register_cached_view(&mut self, name: &str, df: DataFrame) -> DfResult<()> {
        let cached = df.cache().await?;
        self.register_view(name, cached)
    }

    pub async fn view(&self, name: &str) -> DfResult<DataFrame> {
        self.ctx.table(name).await
    }

    /// Release the session. Consumes it so it cannot be used again.
    pub fn close(mut self) {
        self.release();
        tracing::debug!(run_id = %self.run_id, "Engine session closed");
    }

    fn release(&mut self) {
        for name in self.views.drain(..) {
            if let Err(e) = self.ctx.deregister_table(name.as_str()) {
                tracing::warn!(run_id = %self.run_id, view = %name, "Failed to deregister view: {e}");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn registered_views(&self) -> &[String] {
        &self.views
    }

    #[cfg(test)]
    pub(crate) fn context_handle(&self) -> SessionContext {
        self.ctx.clone()
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if !self.views.is_empty() {
            tracing::debug!(run_id = %self.run_id, "Engine session dropped without close");
            self.release();
        }
    }
}
