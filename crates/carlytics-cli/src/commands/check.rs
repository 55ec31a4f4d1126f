use std::path::Path;

use anyhow::{Context, Result};

use carlytics_engine::check_source;
use carlytics_engine::config::{parse_pipeline, validate_pipeline};

/// Execute the `check` command: validate config, source header and sink connectivity.
pub async fn execute(pipeline_path: &Path) -> Result<()> {
    let config = parse_pipeline(pipeline_path)
        .with_context(|| format!("Failed to parse pipeline: {}", pipeline_path.display()))?;
    validate_pipeline(&config)?;
    println!("Pipeline structure: OK");

    let source_ok = match check_source(&config).await {
        Ok(check) => {
            println!("{:18} OK", "Source:");
            println!("  {} column(s) in {}", check.columns.len(), config.source.path.display());
            for (report, missing) in &check.unavailable_reports {
                println!("  {:18} WARNING missing {}", format!("{report}:"), missing.join(", "));
            }
            check.is_complete()
        }
        Err(e) => {
            println!("{:18} FAILED", "Source:");
            println!("  {e}");
            false
        }
    };

    let sink_ok = match dest_postgres::validate(&config.sink).await {
        Ok(message) => {
            println!("{:18} OK", "Sink:");
            println!("  {message}");
            true
        }
        Err(e) => {
            println!("{:18} FAILED", "Sink:");
            println!("  {e}");
            false
        }
    };

    if source_ok && sink_ok {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}
