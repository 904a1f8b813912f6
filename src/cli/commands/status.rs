//! Status command implementation
//!
//! This module implements the `status` command, which reads back the artifact
//! written for a job.

use crate::adapters::store::create_artifact_store;
use crate::config::load_config;
use crate::domain::{ExportArtifact, JobId};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job whose artifact to show
    pub job_id: String,

    /// Also print the artifact content
    #[arg(long)]
    pub show_content: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(job_id = %self.job_id, "Checking job status");

        let job_id = match JobId::new(self.job_id.as_str()) {
            Ok(id) => id,
            Err(e) => {
                println!("❌ Invalid job id: {e}");
                return Ok(2);
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let store = match create_artifact_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to open artifact store");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        let artifact = match store.get_artifact(&job_id).await {
            Ok(a) => a,
            Err(e) => {
                println!("❌ Failed to load artifact");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        match artifact {
            Some(artifact) => {
                println!("{}", describe(&artifact));
                if self.show_content && !artifact.content.is_empty() {
                    println!();
                    print!("{}", artifact.content);
                }
                Ok(if artifact.is_failure() { 1 } else { 0 })
            }
            None => {
                println!("No artifact found for job {job_id}.");
                println!("Run 'catex export' to produce one.");
                Ok(1)
            }
        }
    }
}

fn describe(artifact: &ExportArtifact) -> String {
    let mut lines = vec![
        format!("📊 Job {}", artifact.job_id),
        format!("  Type: {}", artifact.artifact_type),
        format!("  Generated: {}", artifact.generated_at.to_rfc3339()),
        format!("  Status: {}", artifact.status_flag()),
        format!("  Success: {}", artifact.success_flag()),
        format!("  Content bytes: {}", artifact.content.len()),
    ];
    if let Some(error) = &artifact.error {
        lines.push(format!("  Error: {error}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_failed_artifact() {
        let artifact = ExportArtifact::failed(
            JobId::new("job-3").unwrap(),
            "demo",
            "Store error: Query failed: boom",
        );
        let text = describe(&artifact);
        assert!(text.contains("Job job-3"));
        assert!(text.contains("Status: 1"));
        assert!(text.contains("Success: 0"));
        assert!(text.contains("Error: Store error: Query failed: boom"));
    }
}
