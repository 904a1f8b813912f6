//! In-memory store
//!
//! Holds cases, form submissions, variable definitions, locations and
//! artifacts in process memory. Used for fixture-driven runs and as the test
//! double of the PostgreSQL store; it answers batch fetches with the same
//! keyset and join semantics.

use super::snapshot::Snapshot;
use crate::adapters::store::{ArtifactStore, CaseSource, LocationDirectory, VariableCatalog};
use crate::core::cursor::JoinQuery;
use crate::core::links::LinkSelection;
use crate::core::locations::LocationNames;
use crate::domain::{
    CaseRecord, CategoryTag, CategoryVariableDefinition, ExportArtifact, FormSubmission, JobId,
    Result, RowGroup, StoreError,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
struct State {
    cases: BTreeMap<i64, CaseRecord>,
    forms: HashMap<String, HashMap<String, FormSubmission>>,
    variables: Vec<CategoryVariableDefinition>,
    locations: LocationNames,
    artifacts: HashMap<JobId, ExportArtifact>,
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fetches: AtomicUsize,
    fail_after: RwLock<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        for (form, submissions) in snapshot.forms {
            store.add_form(&form);
            for submission in submissions {
                store.add_form_submission(&form, submission);
            }
        }
        for case in snapshot.cases {
            store.insert_case(case);
        }
        for variable in snapshot.variables {
            store.add_variable(variable);
        }
        for location in snapshot.locations {
            store.add_location(location.id, location.name);
        }
        store
    }

    /// Loads a JSON snapshot file
    pub fn from_snapshot_file(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot = Snapshot::from_file(path)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Registers an empty form table
    pub fn add_form(&self, form: &str) {
        self.write().forms.entry(form.to_string()).or_default();
    }

    pub fn add_form_submission(&self, form: &str, submission: FormSubmission) {
        self.write()
            .forms
            .entry(form.to_string())
            .or_default()
            .insert(submission.uuid.clone(), submission);
    }

    /// Adds a case together with its primary form submission
    pub fn add_case(&self, case: CaseRecord, form: &str, submission: FormSubmission) {
        self.add_form_submission(form, submission);
        self.insert_case(case);
    }

    fn insert_case(&self, case: CaseRecord) {
        self.write().cases.insert(case.id, case);
    }

    pub fn add_variable(&self, variable: CategoryVariableDefinition) {
        self.write().variables.push(variable);
    }

    pub fn add_location(&self, id: i64, name: impl Into<String>) {
        self.write().locations.insert(id, name);
    }

    /// Makes every fetch after the first `batches` fail
    pub fn fail_after_batches(&self, batches: usize) {
        *self
            .fail_after
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(batches);
    }

    /// Number of batch fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn case_count(&self) -> usize {
        self.read().cases.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The target uuid a join follows; strict selection is enforced by the cursor
fn join_target<'a>(case: &'a CaseRecord, link: &str, selection: LinkSelection) -> Option<&'a str> {
    match selection {
        LinkSelection::First => case.link_targets(link).first(),
        LinkSelection::Last | LinkSelection::Strict => case.link_targets(link).last(),
    }
    .map(String::as_str)
}

#[async_trait]
impl CaseSource for MemoryStore {
    async fn fetch_batch(
        &self,
        query: &JoinQuery,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Vec<RowGroup>> {
        let served = self.fetches.fetch_add(1, Ordering::SeqCst);
        let fail_after = *self.fail_after.read().unwrap_or_else(PoisonError::into_inner);
        if fail_after.is_some_and(|n| served >= n) {
            return Err(StoreError::QueryFailed(format!(
                "injected failure on fetch {}",
                served + 1
            ))
            .into());
        }

        let state = self.read();
        let primary = state
            .forms
            .get(query.form.as_str())
            .ok_or_else(|| StoreError::UnknownForm(query.form.to_string()))?;
        let mut targets = Vec::with_capacity(query.joins.len());
        for join in &query.joins {
            let table = state
                .forms
                .get(join.target_form.as_str())
                .ok_or_else(|| StoreError::UnknownForm(join.target_form.to_string()))?;
            targets.push(table);
        }

        let lower = after.map_or(std::ops::Bound::Unbounded, std::ops::Bound::Excluded);
        let batch = state
            .cases
            .range((lower, std::ops::Bound::Unbounded))
            .map(|(_, case)| case)
            .filter(|case| query.inclusion.matches(case))
            .filter_map(|case| {
                let form = primary.get(&case.uuid)?;
                let linked = query
                    .joins
                    .iter()
                    .zip(&targets)
                    .map(|(join, table)| {
                        join_target(case, &join.link, query.link_selection)
                            .and_then(|uuid| table.get(uuid))
                            .cloned()
                    })
                    .collect();
                Some(RowGroup {
                    case: case.clone(),
                    form: form.clone(),
                    linked,
                })
            })
            .take(limit)
            .collect();

        Ok(batch)
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl VariableCatalog for MemoryStore {
    async fn variables_for_category(
        &self,
        category: &CategoryTag,
    ) -> Result<Vec<CategoryVariableDefinition>> {
        Ok(self
            .read()
            .variables
            .iter()
            .filter(|v| v.belongs_to(category.as_str()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LocationDirectory for MemoryStore {
    async fn load_locations(&self) -> Result<LocationNames> {
        Ok(self.read().locations.clone())
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn write_artifact(&self, artifact: &ExportArtifact) -> Result<()> {
        let mut state = self.write();
        if state.artifacts.contains_key(&artifact.job_id) {
            return Err(StoreError::AlreadyWritten(artifact.job_id.to_string()).into());
        }
        state
            .artifacts
            .insert(artifact.job_id.clone(), artifact.clone());
        Ok(())
    }

    async fn get_artifact(&self, job_id: &JobId) -> Result<Option<ExportArtifact>> {
        Ok(self.read().artifacts.get(job_id).cloned())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::category::InclusionPredicate;
    use crate::core::links::LinkJoin;
    use crate::domain::{CatexError, FormName};
    use serde_json::json;

    fn query(form: &str, joins: Vec<LinkJoin>) -> JoinQuery {
        JoinQuery {
            form: FormName::new(form).unwrap(),
            joins,
            inclusion: InclusionPredicate::new(["mlp_1"]),
            link_selection: LinkSelection::Last,
        }
    }

    #[tokio::test]
    async fn test_inner_join_on_uuid() {
        let store = MemoryStore::new();
        store.add_case(
            CaseRecord::new(1, "u1").with_variable("mlp_1", 1),
            "demo_case",
            FormSubmission::new("u1", json!({"age": 3})),
        );
        // No submission for u2 in the primary form.
        store.insert_case(CaseRecord::new(2, "u2").with_variable("mlp_1", 1));

        let batch = store
            .fetch_batch(&query("demo_case", vec![]), None, 10)
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].form.field("age"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_left_join_uses_link_selection() {
        let store = MemoryStore::new();
        store.add_form_submission("demo_alert", FormSubmission::new("a1", json!({"n": 1})));
        store.add_form_submission("demo_alert", FormSubmission::new("a2", json!({"n": 2})));
        store.add_case(
            CaseRecord::new(1, "u1")
                .with_variable("mlp_1", 1)
                .with_link("alert", "a1")
                .with_link("alert", "a2"),
            "demo_case",
            FormSubmission::new("u1", json!({})),
        );
        store.add_case(
            CaseRecord::new(2, "u2").with_variable("mlp_1", 1),
            "demo_case",
            FormSubmission::new("u2", json!({})),
        );

        let joins = vec![LinkJoin {
            link: "alert".to_string(),
            target_form: FormName::new("demo_alert").unwrap(),
            slot: 0,
        }];
        let mut q = query("demo_case", joins);
        let batch = store.fetch_batch(&q, None, 10).await.unwrap();
        assert_eq!(batch[0].linked(0).unwrap().uuid, "a2");
        assert!(batch[1].linked(0).is_none());

        q.link_selection = LinkSelection::First;
        let batch = store.fetch_batch(&q, None, 10).await.unwrap();
        assert_eq!(batch[0].linked(0).unwrap().uuid, "a1");
    }

    #[tokio::test]
    async fn test_unknown_form() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.fetch_batch(&query("nope", vec![]), None, 10).await,
            Err(CatexError::Store(StoreError::UnknownForm(_)))
        ));
    }

    #[tokio::test]
    async fn test_artifacts_are_written_once() {
        let store = MemoryStore::new();
        let job_id = JobId::new("job-1").unwrap();
        let artifact = ExportArtifact::completed(job_id.clone(), "demo", "a\n".to_string());

        store.write_artifact(&artifact).await.unwrap();
        assert!(matches!(
            store.write_artifact(&artifact).await,
            Err(CatexError::Store(StoreError::AlreadyWritten(_)))
        ));
        assert_eq!(store.get_artifact(&job_id).await.unwrap(), Some(artifact));
    }

    #[tokio::test]
    async fn test_variables_for_category() {
        let store = MemoryStore::new();
        store.add_variable(CategoryVariableDefinition::new("a", "A", "").in_category("x"));
        store.add_variable(CategoryVariableDefinition::new("b", "B", "").in_category("y"));

        let found = store
            .variables_for_category(&CategoryTag::new("x").unwrap())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a");
    }
}
