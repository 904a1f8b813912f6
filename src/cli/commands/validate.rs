//! Validate config command implementation
//!
//! This module implements the `validate-config` command. With `--job` it also
//! parses the job's descriptors and resolves its link plan, without touching
//! the store.

use crate::config::{load_config, CatexConfig, StoreTarget};
use crate::core::descriptor::{parse_columns, referenced_icd_categories};
use crate::core::links::JoinPlan;
use crate::domain::{ExportJob, Result};
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Job definition file to check against the configuration
    #[arg(long)]
    pub job: Option<PathBuf>,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        print_config_summary(&config);

        let Some(job_path) = &self.job else {
            return Ok(0);
        };

        match check_job(&config, job_path) {
            Ok(report) => {
                println!("✅ Job {} is valid", job_path.display());
                for line in report {
                    println!("  {line}");
                }
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Job {} is invalid", job_path.display());
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}

fn print_config_summary(config: &CatexConfig) {
    println!();
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    match config.store_target {
        StoreTarget::PostgreSQL => {
            if let Some(pg_config) = &config.postgresql {
                use secrecy::ExposeSecret;
                println!("  Store Target: PostgreSQL");
                println!(
                    "  PostgreSQL Connection: {}",
                    pg_config
                        .connection_string
                        .expose_secret()
                        .rsplit('@')
                        .next()
                        .unwrap_or("***")
                );
                println!("  Max Connections: {}", pg_config.max_connections);
            }
        }
        StoreTarget::Fixture => {
            if let Some(fixture) = &config.fixture {
                println!("  Store Target: Fixture");
                println!("  Snapshot: {}", fixture.snapshot_path.display());
                println!("  Artifact Directory: {}", fixture.artifact_dir.display());
            }
        }
    }
    println!("  Batch Size: {}", config.export.batch_size);
    println!("  Batch Timeout: {}s", config.export.batch_timeout_seconds);
    println!("  Link Selection: {}", config.export.link_selection);
    println!("  Epi Week Start: {}", config.export.epi_week_start_day);
    println!();
}

/// Parses the job's descriptors and resolves its links; returns report lines
fn check_job(config: &CatexConfig, path: &Path) -> Result<Vec<String>> {
    let job = ExportJob::from_file(path)?;
    let columns = parse_columns(&job.descriptors)?;
    let links = config.links.load()?;
    let plan = JoinPlan::resolve(&columns, &links)?;

    let mut report = vec![
        format!("Job ID: {}", job.job_id),
        format!("Form: {}", job.form_name),
        format!("Category: {}", job.category),
        format!("Columns: {}", job.output_keys().join(", ")),
    ];
    for join in plan.joins() {
        report.push(format!(
            "Link slot {}: {} -> {}",
            join.slot, join.link, join.target_form
        ));
    }
    for category in referenced_icd_categories(&columns) {
        report.push(format!("ICD names from category: {category}"));
    }
    Ok(report)
}
