use std::path::Path;

use anyhow::{Context, Result};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::pretty::pretty_format_batches;

use carlytics_engine::config::{parse_pipeline, validate_pipeline};
use carlytics_engine::{run_pipeline, MemorySink, PipelineResult, ReportTable};
use dest_postgres::PostgresSink;

/// Execute the `run` command: parse, validate, and run a pipeline.
pub async fn execute(pipeline_path: &Path, dry_run: bool, limit: usize) -> Result<()> {
    let config = parse_pipeline(pipeline_path)
        .with_context(|| format!("Failed to parse pipeline: {}", pipeline_path.display()))?;
    validate_pipeline(&config)?;

    tracing::info!(
        pipeline = config.pipeline,
        source = %config.source.path.display(),
        dry_run,
        "Pipeline validated"
    );

    let result = if dry_run {
        let mut sink = MemorySink::new();
        let result = run_pipeline(&config, &mut sink).await?;
        for table in sink.tables() {
            print_report(table, limit)?;
        }
        result
    } else {
        let mut sink = PostgresSink::connect(&config.sink).await?;
        run_pipeline(&config, &mut sink).await?
    };

    print_summary(&result, dry_run);
    Ok(())
}

/// First `limit` rows of a report, across batch boundaries.
fn head(table: &ReportTable, limit: usize) -> Vec<RecordBatch> {
    let mut remaining = limit;
    let mut out = Vec::new();
    for batch in &table.batches {
        if remaining == 0 {
            break;
        }
        let take = batch.num_rows().min(remaining);
        out.push(batch.slice(0, take));
        remaining -= take;
    }
    out
}

fn print_report(table: &ReportTable, limit: usize) -> Result<()> {
    let rows = table.num_rows();
    println!("\n{} ({} row{})", table.name, rows, if rows == 1 { "" } else { "s" });
    let shown = head(table, limit);
    if shown.iter().all(|b| b.num_rows() == 0) {
        let columns: Vec<_> = table.schema.fields().iter().map(|f| f.name().as_str()).collect();
        println!("  (empty) columns: {}", columns.join(", "));
        return Ok(());
    }
    println!("{}", pretty_format_batches(&shown)?);
    if rows > limit {
        println!("  ... {} more", rows - limit);
    }
    Ok(())
}

fn print_summary(result: &PipelineResult, dry_run: bool) {
    let verb = if dry_run { "computed (dry run)" } else { "completed" };
    println!("\nPipeline '{}' {verb}.", result.pipeline);
    println!("  Run id:          {}", result.run_id);
    println!("  Records loaded:  {}", result.records_loaded);
    println!("  Records kept:    {}", result.records_kept);
    println!("  Records dropped: {}", result.records_dropped);
    println!("  Duration:        {:.2}s", result.duration_secs);
    for report in &result.reports {
        println!(
            "    {:<28} {:>6} rows  compute {:.3}s  write {:.3}s",
            report.name.as_str(),
            report.rows,
            report.compute_secs,
            report.write_secs
        );
    }

    // Machine-readable line for scripts
    match serde_json::to_string(result) {
        Ok(json) => println!("@@RUN_JSON@@{json}"),
        Err(e) => tracing::warn!("Failed to serialize run result: {e}"),
    }
}
