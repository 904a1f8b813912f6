//! Export command implementation
//!
//! This module implements the `export` command, which runs one export job and
//! writes its artifact.

use crate::adapters::store::create_store;
use crate::config::{load_config, CatexConfig};
use crate::core::calendar::ReferenceWeekdayCalendar;
use crate::core::export::{ExportCoordinator, ExportReport, ExportSettings, JobOutcome};
use crate::domain::{CatexError, ExportJob, JobId, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Job definition file (JSON or TOML)
    #[arg(long)]
    pub job: PathBuf,

    /// Override the job id from the job file
    #[arg(long)]
    pub job_id: Option<String>,

    /// Override the number of cases fetched per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Dry run mode - run the job without writing the artifact
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(batch_size) = self.batch_size {
            tracing::info!(batch_size, "Overriding batch size from CLI");
            config.export.batch_size = batch_size;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let job = match self.load_job() {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, job = %self.job.display(), "Failed to load job");
                eprintln!("Failed to load job: {e}");
                return Ok(2);
            }
        };

        if config.application.dry_run {
            tracing::info!("Dry run mode enabled - no artifact will be written");
            println!("🔍 DRY RUN MODE - No artifact will be written");
            println!();
        }

        let coordinator = match build_coordinator(&config).await {
            Ok(c) => c.with_shutdown(shutdown_signal),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(if e.is_configuration() { 2 } else { 5 });
            }
        };

        println!("🚀 Running job {} ({})", job.job_id, job.output_name);

        let report = match coordinator.run(&job).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Artifact could not be written");
                eprintln!("Export failed: {e}");
                return Ok(5);
            }
        };

        print_report(&report);
        Ok(exit_code(report.summary.outcome))
    }

    fn load_job(&self) -> Result<ExportJob> {
        let mut job = ExportJob::from_file(&self.job)?;
        if let Some(job_id) = &self.job_id {
            job.job_id = JobId::new(job_id.as_str()).map_err(CatexError::Configuration)?;
        }
        Ok(job)
    }
}

/// Builds a coordinator from the store, link and calendar configuration
async fn build_coordinator(config: &CatexConfig) -> Result<ExportCoordinator> {
    let links = config.links.load()?;
    let calendar = ReferenceWeekdayCalendar::new(config.export.epi_week_start());
    let stores = create_store(config).await?;

    let context = stores.into_context(Arc::new(links), Arc::new(calendar));
    let settings = ExportSettings::from_config(&config.export, config.application.dry_run);
    Ok(ExportCoordinator::new(context, settings))
}

fn print_report(report: &ExportReport) {
    let summary = &report.summary;
    println!();
    println!("📊 Export Summary:");
    println!("  Job: {}", summary.job_id);
    println!("  Category: {}", summary.category);
    println!("  Outcome: {}", summary.outcome);
    println!("  Rows scanned: {}", summary.rows_scanned);
    println!("  Rows exported: {}", summary.rows_exported);
    println!("  Batches: {}", summary.batches);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!(
        "  Artifact: status={} success={}",
        report.artifact.status_flag(),
        report.artifact.success_flag()
    );
    if let Some(error) = &summary.error {
        println!("  Error: {error}");
    }
    println!();

    match summary.outcome {
        JobOutcome::Completed => println!("✅ Export completed successfully!"),
        JobOutcome::EmptyCategory => println!("⚠️  Category has no variables, empty artifact written"),
        JobOutcome::ConfigurationFailed | JobOutcome::Failed => {
            println!("❌ Export failed, failure artifact written")
        }
    }
}

/// Process exit code for a finished job
pub fn exit_code(outcome: JobOutcome) -> i32 {
    match outcome {
        JobOutcome::Completed | JobOutcome::EmptyCategory => 0,
        JobOutcome::Failed => 1,
        JobOutcome::ConfigurationFailed => 2,
    }
}
