mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "carlytics",
    version,
    about = "Used-vehicle listing reports, computed and written to PostgreSQL"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline: load, clean, compute every report and write it
    Run {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// Compute reports in memory and print them instead of writing
        #[arg(long)]
        dry_run: bool,
        /// Rows printed per report in dry-run mode
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Validate pipeline configuration, source header and sink connectivity
    Check {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
    },
    /// List the reports a run produces
    Reports,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            pipeline,
            dry_run,
            limit,
        } => commands::run::execute(&pipeline, dry_run, limit).await,
        Commands::Check { pipeline } => commands::check::execute(&pipeline).await,
        Commands::Reports => commands::reports::execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["carlytics", "run", "pipeline.yaml"]).unwrap();
        match cli.command {
            Commands::Run {
                pipeline,
                dry_run,
                limit,
            } => {
                assert_eq!(pipeline, PathBuf::from("pipeline.yaml"));
                assert!(!dry_run);
                assert_eq!(limit, 20);
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_global_log_level_after_subcommand() {
        let cli =
            Cli::try_parse_from(["carlytics", "check", "p.yaml", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
    }
}
