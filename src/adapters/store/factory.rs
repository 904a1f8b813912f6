//! Store factory
//!
//! This module builds the store collaborators selected by `store_target`.

use crate::adapters::memory::{FileArtifactStore, MemoryStore};
use crate::adapters::postgresql::{PostgresStore, PostgreSQLClient};
use crate::adapters::store::traits::{
    ArtifactStore, CaseSource, LocationDirectory, VariableCatalog,
};
use crate::config::schema::{CatexConfig, FixtureConfig, PostgreSQLConfig, StoreTarget};
use crate::core::calendar::EpiWeekCalendar;
use crate::core::export::ExportContext;
use crate::core::links::LinkCatalog;
use crate::domain::{CatexError, Result};
use std::sync::Arc;

/// The store-backed collaborators of an export job
///
/// All four handles usually point at the same store instance.
#[derive(Clone)]
pub struct StoreSet {
    pub source: Arc<dyn CaseSource>,
    pub catalog: Arc<dyn VariableCatalog>,
    pub locations: Arc<dyn LocationDirectory>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

impl StoreSet {
    /// Completes the store set into a job context
    pub fn into_context(
        self,
        links: Arc<dyn LinkCatalog>,
        calendar: Arc<dyn EpiWeekCalendar>,
    ) -> ExportContext {
        ExportContext {
            source: self.source,
            catalog: self.catalog,
            locations: self.locations,
            artifacts: self.artifacts,
            links,
            calendar,
        }
    }
}

/// Create the store collaborators based on the configuration
///
/// # Errors
///
/// Returns an error if the selected store section is missing or the store
/// cannot be opened.
pub async fn create_store(config: &CatexConfig) -> Result<StoreSet> {
    match config.store_target {
        StoreTarget::PostgreSQL => {
            let pg_config = postgresql_section(config)?;

            tracing::info!("Creating PostgreSQL store");
            let client = Arc::new(PostgreSQLClient::new(pg_config.clone()).await?);
            client.test_connection().await?;
            client.ensure_schema().await?;
            let store = Arc::new(PostgresStore::new_with_arc(client));

            Ok(StoreSet {
                source: store.clone(),
                catalog: store.clone(),
                locations: store.clone(),
                artifacts: store,
            })
        }
        StoreTarget::Fixture => {
            let fixture = fixture_section(config)?;

            tracing::info!(
                snapshot = %fixture.snapshot_path.display(),
                "Creating fixture store"
            );
            let store = Arc::new(MemoryStore::from_snapshot_file(&fixture.snapshot_path)?);
            let artifacts = Arc::new(FileArtifactStore::new(&fixture.artifact_dir)?);

            Ok(StoreSet {
                source: store.clone(),
                catalog: store.clone(),
                locations: store,
                artifacts,
            })
        }
    }
}

/// Create only the artifact store, for reading back job results
///
/// # Errors
///
/// Returns an error if the selected store section is missing or the store
/// cannot be opened.
pub async fn create_artifact_store(config: &CatexConfig) -> Result<Arc<dyn ArtifactStore>> {
    match config.store_target {
        StoreTarget::PostgreSQL => {
            let pg_config = postgresql_section(config)?;

            tracing::info!("Creating PostgreSQL artifact store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            Ok(Arc::new(PostgresStore::new(client)))
        }
        StoreTarget::Fixture => {
            let fixture = fixture_section(config)?;
            Ok(Arc::new(FileArtifactStore::new(&fixture.artifact_dir)?))
        }
    }
}

fn postgresql_section(config: &CatexConfig) -> Result<&PostgreSQLConfig> {
    config.postgresql.as_ref().ok_or_else(|| {
        CatexError::Configuration(
            "store_target is 'postgresql' but [postgresql] section is missing".to_string(),
        )
    })
}

fn fixture_section(config: &CatexConfig) -> Result<&FixtureConfig> {
    config.fixture.as_ref().ok_or_else(|| {
        CatexError::Configuration(
            "store_target is 'fixture' but [fixture] section is missing".to_string(),
        )
    })
}
