//! Storage collaborator traits
//!
//! These traits define what the export pipeline needs from a backing store.
//! One store usually implements all of them; they are split so tests and the
//! coordinator can depend on exactly the capability they use.

use crate::core::cursor::JoinQuery;
use crate::core::locations::LocationNames;
use crate::domain::{CategoryTag, CategoryVariableDefinition, ExportArtifact, JobId, Result, RowGroup};
use async_trait::async_trait;

/// Source of joined case rows
#[async_trait]
pub trait CaseSource: Send + Sync {
    /// Fetches the next batch of row-groups in ascending case id order
    ///
    /// # Arguments
    ///
    /// * `query` - Primary form, link joins and inclusion codes
    /// * `after` - Only cases with an id strictly greater than this are returned
    /// * `limit` - Maximum number of row-groups in the batch
    ///
    /// A batch shorter than `limit` means the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried or a row cannot be decoded.
    async fn fetch_batch(
        &self,
        query: &JoinQuery,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Vec<RowGroup>>;

    /// Test the store connection
    async fn test_connection(&self) -> Result<()>;
}

/// Catalog of aggregation variable definitions
#[async_trait]
pub trait VariableCatalog: Send + Sync {
    /// All definitions tagged with `category`, in any order
    async fn variables_for_category(
        &self,
        category: &CategoryTag,
    ) -> Result<Vec<CategoryVariableDefinition>>;
}

/// Directory of location names
#[async_trait]
pub trait LocationDirectory: Send + Sync {
    /// Loads every location id and name
    async fn load_locations(&self) -> Result<LocationNames>;
}

/// Persistence for export artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists the artifact of a job
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::StoreError::AlreadyWritten`] if the job already
    /// has an artifact.
    async fn write_artifact(&self, artifact: &ExportArtifact) -> Result<()>;

    /// Loads the artifact of a job, if one was written
    async fn get_artifact(&self, job_id: &JobId) -> Result<Option<ExportArtifact>>;

    /// Short name used in logs
    fn store_name(&self) -> &str;
}
