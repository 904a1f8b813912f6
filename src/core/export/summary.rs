//! Export summary and reporting

use crate::domain::{CategoryTag, ExportArtifact, JobId};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// How a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Pipeline ran to completion, possibly with zero data rows
    Completed,
    /// No variable definitions matched the category
    EmptyCategory,
    /// Configuration error detected before streaming
    ConfigurationFailed,
    /// Store, timeout or cancellation failure after the job started
    Failed,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Completed => "completed",
            JobOutcome::EmptyCategory => "empty_category",
            JobOutcome::ConfigurationFailed => "configuration_failed",
            JobOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one export job
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub job_id: JobId,

    pub category: CategoryTag,

    pub outcome: JobOutcome,

    /// Row-groups received from the store
    pub rows_scanned: usize,

    /// Rows written to the table
    pub rows_exported: usize,

    pub batches: usize,

    pub duration: Duration,

    /// SHA-256 of the artifact content, hex encoded
    pub checksum: Option<String>,

    pub error: Option<String>,
}

impl ExportSummary {
    pub fn new(job_id: JobId, category: CategoryTag) -> Self {
        Self {
            job_id,
            category,
            outcome: JobOutcome::Completed,
            rows_scanned: 0,
            rows_exported: 0,
            batches: 0,
            duration: Duration::from_secs(0),
            checksum: None,
            error: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Records the artifact checksum
    pub fn record_artifact(&mut self, artifact: &ExportArtifact) {
        self.checksum = Some(content_checksum(&artifact.content));
    }

    pub fn is_successful(&self) -> bool {
        self.outcome == JobOutcome::Completed
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            job_id = %self.job_id,
            category = %self.category,
            outcome = %self.outcome,
            rows_scanned = self.rows_scanned,
            rows_exported = self.rows_exported,
            batches = self.batches,
            duration_ms = self.duration.as_millis() as u64,
            checksum = self.checksum.as_deref().unwrap_or(""),
            "Export summary"
        );

        if let Some(ref error) = self.error {
            tracing::warn!(job_id = %self.job_id, error = %error, "Export job failed");
        }
    }
}

/// Hex-encoded SHA-256 of `content`
pub fn content_checksum(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
