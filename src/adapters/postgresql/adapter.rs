//! PostgreSQL adapter implementing the store traits

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    artifact_from_row, cursor_sql, row_group_from_row, variable_from_row, INSERT_ARTIFACT_SQL,
    LOCATIONS_SQL, SELECT_ARTIFACT_SQL, VARIABLES_FOR_CATEGORY_SQL,
};
use crate::adapters::store::{ArtifactStore, CaseSource, LocationDirectory, VariableCatalog};
use crate::core::cursor::JoinQuery;
use crate::core::locations::LocationNames;
use crate::domain::{
    CategoryTag, CategoryVariableDefinition, ExportArtifact, JobId, Result, RowGroup, StoreError,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// PostgreSQL-backed store
///
/// Reads cases from the `data` table joined to per-form tables, definitions
/// from `aggregation_variables`, names from `locations`, and writes artifacts
/// to `download_data_files`.
pub struct PostgresStore {
    client: Arc<PostgreSQLClient>,
}

impl PostgresStore {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CaseSource for PostgresStore {
    async fn fetch_batch(
        &self,
        query: &JoinQuery,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Vec<RowGroup>> {
        let sql = cursor_sql(query);

        let codes: Vec<String> = query.inclusion.codes().map(str::to_string).collect();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let link_names: Vec<&str> = query.joins.iter().map(|j| j.link.as_str()).collect();

        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&codes, &after, &limit];
        for name in &link_names {
            params.push(name);
        }

        let rows = self.client.query(&sql, &params).await?;
        tracing::trace!(form = %query.form, rows = rows.len(), "Cursor query returned");

        rows.iter()
            .map(|row| row_group_from_row(row, query.joins.len()))
            .collect()
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }
}

#[async_trait]
impl VariableCatalog for PostgresStore {
    async fn variables_for_category(
        &self,
        category: &CategoryTag,
    ) -> Result<Vec<CategoryVariableDefinition>> {
        let tag = category.as_str();
        let rows = self.client.query(VARIABLES_FOR_CATEGORY_SQL, &[&tag]).await?;
        rows.iter().map(variable_from_row).collect()
    }
}

#[async_trait]
impl LocationDirectory for PostgresStore {
    async fn load_locations(&self) -> Result<LocationNames> {
        let rows = self.client.query(LOCATIONS_SQL, &[]).await?;

        let mut names = LocationNames::default();
        for row in &rows {
            let id: i64 = row
                .try_get("id")
                .map_err(|e| StoreError::MalformedRow(format!("locations.id: {e}")))?;
            let name: Option<String> = row
                .try_get("name")
                .map_err(|e| StoreError::MalformedRow(format!("locations.name: {e}")))?;
            if let Some(name) = name {
                names.insert(id, name);
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl ArtifactStore for PostgresStore {
    async fn write_artifact(&self, artifact: &ExportArtifact) -> Result<()> {
        let status = i32::from(artifact.status_flag());
        let success = i32::from(artifact.success_flag());

        let inserted = self
            .client
            .execute(
                INSERT_ARTIFACT_SQL,
                &[
                    &artifact.job_id.as_str(),
                    &artifact.artifact_type,
                    &artifact.generated_at,
                    &artifact.content,
                    &status,
                    &success,
                    &artifact.error,
                ],
            )
            .await?;

        if inserted == 0 {
            return Err(StoreError::AlreadyWritten(artifact.job_id.to_string()).into());
        }

        tracing::debug!(
            job_id = %artifact.job_id,
            success,
            bytes = artifact.content.len(),
            "Artifact written to PostgreSQL"
        );
        Ok(())
    }

    async fn get_artifact(&self, job_id: &JobId) -> Result<Option<ExportArtifact>> {
        let rows = self
            .client
            .query(SELECT_ARTIFACT_SQL, &[&job_id.as_str()])
            .await?;
        rows.first().map(artifact_from_row).transpose()
    }

    fn store_name(&self) -> &str {
        "postgresql"
    }
}
