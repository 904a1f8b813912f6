//! Tabular sink and artifact commit
//!
//! [`CsvSink`] accumulates the header and projected rows. [`ArtifactSink`]
//! turns a job outcome into exactly one artifact write: its commit methods take
//! `self`, so a job cannot write twice.

use crate::adapters::store::ArtifactStore;
use crate::core::descriptor::render_value;
use crate::core::projector::Cell;
use crate::domain::{CatexError, ExportArtifact, JobId, Result};
use std::sync::Arc;

/// CSV writer over an in-memory buffer
pub struct CsvSink {
    writer: csv::Writer<Vec<u8>>,
    width: usize,
    rows: usize,
}

impl CsvSink {
    /// Creates the sink and writes the header row
    pub fn new(header: &[&str]) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(header)?;
        Ok(Self {
            writer,
            width: header.len(),
            rows: 0,
        })
    }

    pub fn write_row(&mut self, cells: &[Cell]) -> Result<()> {
        if cells.len() != self.width {
            return Err(CatexError::Serialization(format!(
                "row has {} cells, header has {}",
                cells.len(),
                self.width
            )));
        }
        self.writer.write_record(
            cells
                .iter()
                .map(|cell| cell.as_ref().map(render_value).unwrap_or_default()),
        )?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flushes and returns the complete table text
    pub fn finish(self) -> Result<String> {
        let bytes = self
            .writer
            .into_inner()
            .map_err(|e| CatexError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CatexError::Serialization(e.to_string()))
    }
}

/// Persists the single artifact of a job
pub struct ArtifactSink {
    store: Arc<dyn ArtifactStore>,
    job_id: JobId,
    artifact_type: String,
    dry_run: bool,
}

impl ArtifactSink {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        job_id: JobId,
        artifact_type: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            store,
            job_id,
            artifact_type: artifact_type.into(),
            dry_run,
        }
    }

    /// `status=1, success=1` with the table text
    pub async fn complete(self, content: String) -> Result<ExportArtifact> {
        let artifact = ExportArtifact::completed(self.job_id.clone(), &self.artifact_type, content);
        self.commit(artifact).await
    }

    /// `status=1, success=0`, empty content
    pub async fn empty_category(self) -> Result<ExportArtifact> {
        let artifact = ExportArtifact::empty_category(self.job_id.clone(), &self.artifact_type);
        self.commit(artifact).await
    }

    /// `status=1, success=0`, empty content and the failure reason
    pub async fn fail(self, error: &CatexError) -> Result<ExportArtifact> {
        let artifact =
            ExportArtifact::failed(self.job_id.clone(), &self.artifact_type, error.to_string());
        self.commit(artifact).await
    }

    async fn commit(self, artifact: ExportArtifact) -> Result<ExportArtifact> {
        if self.dry_run {
            tracing::info!(
                job_id = %artifact.job_id,
                success = artifact.success_flag(),
                bytes = artifact.content.len(),
                "DRY RUN: Would write artifact to {}",
                self.store.store_name()
            );
            return Ok(artifact);
        }

        self.store.write_artifact(&artifact).await.map_err(|e| {
            tracing::error!(job_id = %artifact.job_id, error = %e, "Artifact write failed");
            e
        })?;
        Ok(artifact)
    }
}
