//! Pipeline orchestrator: load, clean and enrich once, then compute and
//! write every report in catalogue order.

use std::time::Instant;

use datafusion::error::DataFusionError;

use crate::catalogue::{catalogue, compute_report, register_price_ranges};
use crate::cleaner::clean;
use crate::config::PipelineConfig;
use crate::errors::{IngestionError, PipelineError, TransformError};
use crate::loader::load;
use crate::result::{CheckResult, PipelineResult, ReportOutcome};
use crate::session::{EngineSession, VEHICLES_VIEW};
use crate::sink::ReportSink;
use crate::transform::{enrich, with_price_range};

/// Run the pipeline once, writing each report to `sink`.
///
/// Fails fast: the first error stops the run and `sink.abort()` is called.
/// Reports already written stay written unless the sink defers them. The
/// engine session is released on every exit path.
pub async fn run_pipeline<S: ReportSink>(
    config: &PipelineConfig,
    sink: &mut S,
) -> Result<PipelineResult, PipelineError> {
    let start = Instant::now();
    let mut session = EngineSession::open(&config.engine);
    let run_id = session.run_id();

    tracing::info!(
        %run_id,
        pipeline = config.pipeline,
        source = %config.source.path.display(),
        "Starting pipeline run"
    );

    let outcome = match execute(config, &mut session, sink).await {
        Ok(run) => match sink.finish().await {
            Ok(()) => Ok(run),
            Err(e) => {
                abort_sink(sink, run_id).await;
                Err(PipelineError::from(e))
            }
        },
        Err(e) => {
            abort_sink(sink, run_id).await;
            Err(e)
        }
    };
    session.close();

    let (counts, reports) = outcome.map_err(|e| {
        tracing::error!(%run_id, pipeline = config.pipeline, stage = e.stage(), "Pipeline run failed: {e}");
        e
    })?;

    let result = PipelineResult {
        run_id,
        pipeline: config.pipeline.clone(),
        records_loaded: counts.loaded,
        records_kept: counts.kept,
        records_dropped: counts.loaded.saturating_sub(counts.kept),
        reports,
        duration_secs: start.elapsed().as_secs_f64(),
    };
    tracing::info!(
        %run_id,
        pipeline = config.pipeline,
        records_loaded = result.records_loaded,
        records_kept = result.records_kept,
        reports = result.reports.len(),
        duration_secs = result.duration_secs,
        "Pipeline run completed"
    );
    Ok(result)
}

struct RecordCounts {
    loaded: u64,
    kept: u64,
}

async fn execute<S: ReportSink>(
    config: &PipelineConfig,
    session: &mut EngineSession,
    sink: &mut S,
) -> Result<(RecordCounts, Vec<ReportOutcome>), PipelineError> {
    let run_id = session.run_id();
    let columns = &config.source.columns;

    let read_err = |source: DataFusionError| IngestionError::Read {
        path: config.source.path.clone(),
        source,
    };
    // The file is read exactly once; later stages work on the in-memory copy.
    let raw = load(session, &config.source)
        .await?
        .cache()
        .await
        .map_err(read_err)?;
    let loaded = raw.clone().count().await.map_err(read_err)?;

    let enriched = enrich(clean(raw, columns).map_err(TransformError::from)?, columns)?;
    session
        .register_cached_view(VEHICLES_VIEW, enriched)
        .await
        .map_err(TransformError::from)?;
    register_price_ranges(session).await?;

    let kept = session
        .view(VEHICLES_VIEW)
        .await
        .map_err(TransformError::from)?
        .count()
        .await
        .map_err(TransformError::from)?;
    tracing::info!(
        %run_id,
        loaded,
        kept,
        dropped = loaded.saturating_sub(kept),
        "Records cleaned"
    );

    let mut outcomes = Vec::new();
    for descriptor in catalogue() {
        let compute_start = Instant::now();
        let table = compute_report(session, columns, &descriptor).await?;
        let compute_secs = compute_start.elapsed().as_secs_f64();

        let write_start = Instant::now();
        sink.write_report(&table).await?;
        let write_secs = write_start.elapsed().as_secs_f64();

        let rows = table.num_rows();
        tracing::info!(
            %run_id,
            report = %descriptor.name,
            rows,
            compute_secs,
            write_secs,
            "Report written"
        );
        outcomes.push(ReportOutcome {
            name: descriptor.name,
            rows,
            compute_secs,
            write_secs,
        });
    }

    let counts = RecordCounts {
        loaded: loaded as u64,
        kept: kept as u64,
    };
    Ok((counts, outcomes))
}

async fn abort_sink<S: ReportSink>(sink: &mut S, run_id: uuid::Uuid) {
    if let Err(e) = sink.abort().await {
        tracing::warn!(%run_id, "Sink abort failed: {e}");
    }
}

/// Check the source header and report which reports its columns can serve.
///
/// Only the schema is inferred; no report is executed.
pub async fn check_source(config: &PipelineConfig) -> Result<CheckResult, PipelineError> {
    let session = EngineSession::open(&config.engine);
    let columns = &config.source.columns;

    let raw = load(&session, &config.source).await?;
    let header = raw
        .schema()
        .fields()
        .iter()
        .map(|f| (f.name().clone(), f.data_type().clone()))
        .collect();

    let planned = with_price_range(enrich(
        clean(raw, columns).map_err(TransformError::from)?,
        columns,
    )?)?;

    let mut unavailable_reports = Vec::new();
    for descriptor in catalogue() {
        let mut missing: Vec<String> = Vec::new();
        for field in descriptor.referenced_fields() {
            let name = field.column(columns);
            if !planned.schema().has_column_with_unqualified_name(name)
                && !missing.iter().any(|m| m == name)
            {
                missing.push(name.to_string());
            }
        }
        if !missing.is_empty() {
            tracing::warn!(report = %descriptor.name, missing = ?missing, "Report cannot be computed from source");
            unavailable_reports.push((descriptor.name, missing));
        }
    }
    session.close();

    Ok(CheckResult {
        columns: header,
        unavailable_reports,
    })
}
