//! Artifact store on the local filesystem
//!
//! Each job produces `<job_id>.json` with the artifact metadata and, when the
//! artifact has content, `<job_id>.csv`. Both are staged under temporary names
//! first. The job id is claimed by hard-linking the staged metadata to its
//! final name, which fails if the job already has an artifact; a claim whose
//! content cannot be moved into place is withdrawn again.

use crate::adapters::store::ArtifactStore;
use crate::domain::{CatexError, ExportArtifact, JobId, Result, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Metadata persisted next to the content file
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactRecord {
    #[serde(flatten)]
    artifact: ExportArtifact,
    #[serde(default)]
    content_file: Option<String>,
}

pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    /// Creates the store, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            CatexError::Configuration(format!(
                "Failed to create artifact directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    fn metadata_path(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{}.json", job_id))
    }

    fn content_name(job_id: &JobId) -> String {
        format!("{}.csv", job_id)
    }

    fn staging_path(&self, job_id: &JobId, extension: &str) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.{}.tmp", job_id, uuid::Uuid::new_v4(), extension))
    }

    async fn publish(
        &self,
        artifact: &ExportArtifact,
        staged_metadata: &Path,
        staged_content: Option<&Path>,
    ) -> Result<()> {
        let metadata_path = self.metadata_path(&artifact.job_id);

        match tokio::fs::hard_link(staged_metadata, &metadata_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyWritten(artifact.job_id.to_string()).into());
            }
            Err(e) => return Err(artifact_error("claim", &metadata_path, e)),
        }

        if let Some(staged) = staged_content {
            let content_path = self.dir.join(Self::content_name(&artifact.job_id));
            if let Err(e) = tokio::fs::rename(staged, &content_path).await {
                if let Err(cleanup) = tokio::fs::remove_file(&metadata_path).await {
                    tracing::warn!(
                        job_id = %artifact.job_id,
                        error = %cleanup,
                        "Failed to withdraw artifact claim"
                    );
                }
                return Err(artifact_error("write", &content_path, e));
            }
        }
        Ok(())
    }
}

fn artifact_error(action: &str, path: &Path, err: std::io::Error) -> CatexError {
    CatexError::Artifact(format!("Failed to {} {}: {}", action, path.display(), err))
}

async fn stage(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| artifact_error("write", path, e))
}

/// Removes staging files; they are left behind only if this fails too
async fn discard(paths: &[&Path]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove staging file"),
        }
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn write_artifact(&self, artifact: &ExportArtifact) -> Result<()> {
        let job_id = &artifact.job_id;
        if tokio::fs::try_exists(self.metadata_path(job_id)).await? {
            return Err(StoreError::AlreadyWritten(job_id.to_string()).into());
        }

        let has_content = !artifact.content.is_empty();
        let mut record_artifact = artifact.clone();
        record_artifact.content = String::new();
        let record = ArtifactRecord {
            artifact: record_artifact,
            content_file: has_content.then(|| Self::content_name(job_id)),
        };
        let json = serde_json::to_vec_pretty(&record)?;

        let staged_metadata = self.staging_path(job_id, "json");
        let staged_content = has_content.then(|| self.staging_path(job_id, "csv"));

        let result: Result<()> = async {
            if let Some(path) = &staged_content {
                stage(path, artifact.content.as_bytes()).await?;
            }
            stage(&staged_metadata, &json).await?;
            self.publish(artifact, &staged_metadata, staged_content.as_deref())
                .await
        }
        .await;

        let mut leftovers = vec![staged_metadata.as_path()];
        leftovers.extend(staged_content.as_deref());
        discard(&leftovers).await;
        result?;

        tracing::debug!(
            job_id = %job_id,
            dir = %self.dir.display(),
            bytes = artifact.content.len(),
            "Artifact written"
        );
        Ok(())
    }

    async fn get_artifact(&self, job_id: &JobId) -> Result<Option<ExportArtifact>> {
        let metadata_path = self.metadata_path(job_id);
        let raw = match tokio::fs::read(&metadata_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: ArtifactRecord = serde_json::from_slice(&raw)?;

        let mut artifact = record.artifact;
        if let Some(content_file) = &record.content_file {
            artifact.content = tokio::fs::read_to_string(self.dir.join(content_file)).await?;
        }
        Ok(Some(artifact))
    }

    fn store_name(&self) -> &str {
        "filesystem"
    }
}
