//! Export artifact model
//!
//! The artifact is the only thing a caller of an export job ever sees: its
//! `status` and `success` flags plus the tabular content. One artifact is
//! written per job invocation and never mutated afterwards.

use crate::domain::ids::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artifact lifecycle status (`0` pending, `1` done)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ArtifactStatus {
    Pending,
    Done,
}

impl From<ArtifactStatus> for u8 {
    fn from(status: ArtifactStatus) -> u8 {
        match status {
            ArtifactStatus::Pending => 0,
            ArtifactStatus::Done => 1,
        }
    }
}

impl TryFrom<u8> for ArtifactStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ArtifactStatus::Pending),
            1 => Ok(ArtifactStatus::Done),
            other => Err(format!("invalid artifact status {other}")),
        }
    }
}

/// The persisted result of one export job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub job_id: JobId,

    /// Tabular text (CSV with header row); empty for unsuccessful jobs
    pub content: String,

    /// Report name the job was asked to produce
    #[serde(rename = "type")]
    pub artifact_type: String,

    pub status: ArtifactStatus,

    /// `1` if the pipeline ran to completion, `0` for empty-category or failed jobs
    #[serde(with = "flag")]
    pub success: bool,

    pub generated_at: DateTime<Utc>,

    /// Reason for a failed job; `None` for completed and empty-category jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportArtifact {
    /// Artifact for a pipeline that ran to completion (even with zero data rows)
    pub fn completed(job_id: JobId, artifact_type: impl Into<String>, content: String) -> Self {
        Self {
            job_id,
            content,
            artifact_type: artifact_type.into(),
            status: ArtifactStatus::Done,
            success: true,
            generated_at: Utc::now(),
            error: None,
        }
    }

    /// Artifact for a category with no matching variable definitions
    pub fn empty_category(job_id: JobId, artifact_type: impl Into<String>) -> Self {
        Self {
            job_id,
            content: String::new(),
            artifact_type: artifact_type.into(),
            status: ArtifactStatus::Done,
            success: false,
            generated_at: Utc::now(),
            error: None,
        }
    }

    /// Explicit failure artifact; never carries partial content
    pub fn failed(
        job_id: JobId,
        artifact_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            content: String::new(),
            artifact_type: artifact_type.into(),
            status: ArtifactStatus::Done,
            success: false,
            generated_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    pub fn status_flag(&self) -> u8 {
        self.status.into()
    }

    pub fn success_flag(&self) -> u8 {
        u8::from(self.success)
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Serializes a bool as the integer flag `0`/`1`
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(serde::de::Error::custom(format!(
                "invalid success flag {other}"
            ))),
        }
    }
}
