//! Integration tests for the export pipeline
//!
//! Jobs run end to end against the in-memory store: descriptors, category
//! filtering, link joins, batching and the single artifact write.

use async_trait::async_trait;
use catex::adapters::memory::MemoryStore;
use catex::adapters::store::{ArtifactStore, CaseSource};
use catex::core::calendar::ReferenceWeekdayCalendar;
use catex::core::cursor::JoinQuery;
use catex::core::export::{ExportContext, ExportCoordinator, ExportSettings, JobOutcome};
use catex::core::links::{LinkDefinition, LinkDefinitions, LinkSelection};
use catex::domain::{
    CaseRecord, CategoryTag, CategoryVariableDefinition, DescriptorSpec, ExportArtifact, ExportJob,
    FormName, FormSubmission, JobId, Result, RowGroup,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const FULL_HEADER: &str = "Region,District,Clinic,Age,Gender,Week,Disease,Lab,Source";

fn demo_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store.add_location(1, "Demo");
    store.add_location(2, "Region 1");
    store.add_location(4, "District 1");
    store.add_location(7, "Clinic 1");

    store.add_variable(CategoryVariableDefinition::new("cmd_1", "Cholera", "A00").in_category("cd_tab"));
    store.add_variable(CategoryVariableDefinition::new("cmd_2", "Malaria", "B54").in_category("cd_tab"));
    store.add_variable(CategoryVariableDefinition::new("ncd_1", "Diabetes", "E10").in_category("ncd_tab"));
    store.add_variable(CategoryVariableDefinition::new("rare_1", "Rare", "Z99").in_category("rare_tab"));

    store.add_form("demo_alert");
    store.add_form_submission(
        "demo_alert",
        FormSubmission::new("a1", json!({"alert_labs./return_lab": "positive"})),
    );
    store.add_form_submission(
        "demo_alert",
        FormSubmission::new("a2", json!({"alert_labs./return_lab": "negative"})),
    );

    let mut case1 = CaseRecord::new(1, "u1")
        .with_variable("cmd_1", 1)
        .with_variable("gen_2", 1)
        .with_link("alert_investigation", "a1");
    case1.country = Some(1);
    case1.region = Some(2);
    case1.clinic = Some(7);
    store.add_case(
        case1,
        "demo_case",
        FormSubmission::new(
            "u1",
            json!({"pt./age": 31, "visit_date": "2015-04-30T23:54:16.049059", "icd_code": "A00"}),
        ),
    );

    store.add_case(
        CaseRecord::new(2, "u2").with_variable("ncd_1", 1),
        "demo_case",
        FormSubmission::new("u2", json!({"pt./age": 70, "icd_code": "E10"})),
    );

    let mut case3 = CaseRecord::new(3, "u3").with_variable("cmd_2", 1);
    case3.region = Some(2);
    case3.district = Some(4);
    store.add_case(
        case3,
        "demo_case",
        FormSubmission::new("u3", json!({"pt./age": 5, "icd_code": "B54"})),
    );

    store.add_case(
        CaseRecord::new(4, "u4")
            .with_variable("cmd_1", 1)
            .with_variable("gen_1", 1),
        "demo_case",
        FormSubmission::new("u4", json!({"pt./age": 60, "icd_code": " A00 "})),
    );

    store
}

fn links() -> LinkDefinitions {
    LinkDefinitions::new(vec![LinkDefinition {
        name: "alert_investigation".to_string(),
        from_form: Some(FormName::new("demo_case").unwrap()),
        to_form: FormName::new("demo_alert").unwrap(),
    }])
}

fn context(store: Arc<MemoryStore>) -> ExportContext {
    ExportContext {
        source: store.clone(),
        catalog: store.clone(),
        locations: store.clone(),
        artifacts: store,
        links: Arc::new(links()),
        calendar: Arc::new(ReferenceWeekdayCalendar::default()),
    }
}

fn settings(batch_size: usize) -> ExportSettings {
    ExportSettings {
        batch_size,
        ..ExportSettings::default()
    }
}

fn job(job_id: &str, category: &str, descriptors: &[(&str, &str)]) -> ExportJob {
    ExportJob {
        job_id: JobId::new(job_id).unwrap(),
        form_name: FormName::new("demo_case").unwrap(),
        category: CategoryTag::new(category).unwrap(),
        output_name: "demo_report".to_string(),
        descriptors: descriptors
            .iter()
            .map(|(source, key)| DescriptorSpec::new(*source, *key))
            .collect(),
    }
}

fn full_job(job_id: &str) -> ExportJob {
    job(
        job_id,
        "cd_tab",
        &[
            ("region", "Region"),
            ("district", "District"),
            ("clinic", "Clinic"),
            ("pt./age", "Age"),
            ("code$gen_1,gen_2$Male,Female$Unknown", "Gender"),
            ("visit_date$epi_week", "Week"),
            ("icd_name$cd_tab", "Disease"),
            ("gen_link$alert_investigation$alert_labs./return_lab", "Lab"),
            ("value:demo", "Source"),
        ],
    )
}

#[tokio::test]
async fn test_full_export_rows_and_columns() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store.clone()), settings(200));

    let report = coordinator.run(&full_job("job-full")).await.unwrap();

    let expected = [
        FULL_HEADER,
        "Region 1,,Clinic 1,31,Female,18,Cholera,positive,demo",
        "Region 1,District 1,,5,Unknown,,Malaria,,demo",
        ",,,60,Male,,Cholera,,demo",
    ]
    .join("\n")
        + "\n";
    assert_eq!(report.artifact.content, expected);
    assert_eq!(report.artifact.status_flag(), 1);
    assert_eq!(report.artifact.success_flag(), 1);
    assert_eq!(report.summary.outcome, JobOutcome::Completed);
    assert_eq!(report.summary.rows_exported, 3);

    let stored = store
        .get_artifact(&JobId::new("job-full").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, expected);
    assert_eq!(stored.artifact_type, "demo_report");
}

#[tokio::test]
async fn test_non_category_cases_are_excluded() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store), settings(200));

    let report = coordinator
        .run(&job("job-ncd", "ncd_tab", &[("pt./age", "Age"), ("icd_name$ncd_tab", "Disease")]))
        .await
        .unwrap();

    assert_eq!(report.artifact.content, "Age,Disease\n70,Diabetes\n");
}

#[tokio::test]
async fn test_batch_size_does_not_change_content() {
    let store = demo_store();
    let mut contents = Vec::new();

    for batch_size in [1, 2, 3, 200] {
        let coordinator = ExportCoordinator::new(context(store.clone()), settings(batch_size));
        let report = coordinator
            .run(&full_job(&format!("job-batch-{batch_size}")))
            .await
            .unwrap();
        assert_eq!(report.summary.outcome, JobOutcome::Completed);
        contents.push(report.artifact.content);
    }

    assert!(contents.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_batches_are_counted() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store), settings(2));

    let report = coordinator.run(&full_job("job-count")).await.unwrap();

    // 3 included cases at 2 per batch: a full batch, then a short one ends the cursor.
    assert_eq!(report.summary.batches, 2);
    assert_eq!(report.summary.rows_scanned, 3);
    assert_eq!(report.summary.rows_exported, 3);
}

#[tokio::test]
async fn test_translate_applies_to_computed_value() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store), settings(200));

    let report = coordinator
        .run(&job(
            "job-translate",
            "cd_tab",
            &[("code$gen_1,gen_2$M,F$translate;{'M':'Male','F':'Female'}", "Gender")],
        ))
        .await
        .unwrap();

    // A record made of one empty field is written as `""`.
    assert_eq!(report.artifact.content, "Gender\nFemale\n\"\"\nMale\n");
}

#[tokio::test]
async fn test_empty_category_writes_unsuccessful_artifact() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store.clone()), settings(200));

    let report = coordinator
        .run(&job("job-empty", "no_such_tab", &[("pt./age", "Age")]))
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::EmptyCategory);
    assert_eq!(report.artifact.status_flag(), 1);
    assert_eq!(report.artifact.success_flag(), 0);
    assert_eq!(report.artifact.content, "");
    assert!(report.artifact.error.is_none());
    assert_eq!(store.fetch_count(), 0);
}

#[tokio::test]
async fn test_zero_rows_writes_header_only() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store), settings(200));

    let report = coordinator
        .run(&job("job-zero", "rare_tab", &[("region", "Region"), ("pt./age", "Age")]))
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::Completed);
    assert_eq!(report.artifact.success_flag(), 1);
    assert_eq!(report.artifact.content, "Region,Age\n");
}

#[tokio::test]
async fn test_bad_descriptor_writes_failure_artifact() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store.clone()), settings(200));

    let report = coordinator
        .run(&job("job-bad", "cd_tab", &[("pt./age", "Age"), ("a$b$c", "Broken")]))
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::ConfigurationFailed);
    assert_eq!(report.artifact.status_flag(), 1);
    assert_eq!(report.artifact.success_flag(), 0);
    assert_eq!(report.artifact.content, "");
    assert!(report.artifact.error.is_some());
    assert_eq!(store.fetch_count(), 0);
}

#[tokio::test]
async fn test_unknown_link_is_configuration_failure() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store), settings(200));

    let report = coordinator
        .run(&job("job-link", "cd_tab", &[("gen_link$missing_link$x", "X")]))
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::ConfigurationFailed);
    assert!(report.artifact.error.unwrap().contains("missing_link"));
}

#[tokio::test]
async fn test_mid_stream_failure_leaves_no_partial_content() {
    let store = demo_store();
    store.fail_after_batches(1);
    let coordinator = ExportCoordinator::new(context(store.clone()), settings(1));

    let report = coordinator.run(&full_job("job-fail")).await.unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::Failed);
    assert_eq!(report.artifact.success_flag(), 0);
    assert_eq!(report.artifact.content, "");

    let stored = store
        .get_artifact(&JobId::new("job-fail").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, "");
    assert!(stored.error.unwrap().contains("injected failure"));
}

#[tokio::test]
async fn test_unknown_primary_form_fails_job() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store), settings(200));

    let mut missing = job("job-form", "cd_tab", &[("pt./age", "Age")]);
    missing.form_name = FormName::new("no_such_form").unwrap();
    let report = coordinator.run(&missing).await.unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::Failed);
    assert_eq!(report.artifact.success_flag(), 0);
}

#[tokio::test]
async fn test_cancellation_writes_failure_artifact() {
    let store = demo_store();
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let coordinator = ExportCoordinator::new(context(store.clone()), settings(1)).with_shutdown(rx);
    let report = coordinator.run(&full_job("job-cancel")).await.unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::Failed);
    assert_eq!(report.artifact.content, "");
    assert_eq!(store.fetch_count(), 0);
}

#[tokio::test]
async fn test_dropped_shutdown_sender_does_not_cancel() {
    let store = demo_store();
    let (tx, rx) = watch::channel(false);
    drop(tx);

    let coordinator = ExportCoordinator::new(context(store), settings(1)).with_shutdown(rx);
    let report = coordinator.run(&full_job("job-nocancel")).await.unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::Completed);
    assert_eq!(report.summary.rows_exported, 3);
}

/// Case source whose fetches never finish in time
struct StalledSource;

#[async_trait]
impl CaseSource for StalledSource {
    async fn fetch_batch(
        &self,
        _query: &JoinQuery,
        _after: Option<i64>,
        _limit: usize,
    ) -> Result<Vec<RowGroup>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_batch_timeout_fails_job() {
    let store = demo_store();
    let mut ctx = context(store.clone());
    ctx.source = Arc::new(StalledSource);

    let settings = ExportSettings {
        batch_timeout: Some(Duration::from_millis(50)),
        ..ExportSettings::default()
    };
    let report = ExportCoordinator::new(ctx, settings)
        .run(&full_job("job-timeout"))
        .await
        .unwrap();

    assert_eq!(report.summary.outcome, JobOutcome::Failed);
    assert!(report.artifact.error.unwrap().to_lowercase().contains("timed out"));
}

fn two_link_store() -> Arc<MemoryStore> {
    let store = demo_store();
    store.add_case(
        CaseRecord::new(10, "u10")
            .with_variable("cmd_1", 1)
            .with_link("alert_investigation", "a1")
            .with_link("alert_investigation", "a2"),
        "demo_case",
        FormSubmission::new("u10", json!({})),
    );
    store
}

async fn lab_column(store: Arc<MemoryStore>, selection: LinkSelection, job_id: &str) -> ExportArtifact {
    let settings = ExportSettings {
        link_selection: selection,
        ..ExportSettings::default()
    };
    ExportCoordinator::new(context(store), settings)
        .run(&job(
            job_id,
            "cd_tab",
            &[("gen_link$alert_investigation$alert_labs./return_lab", "Lab")],
        ))
        .await
        .unwrap()
        .artifact
}

#[tokio::test]
async fn test_link_selection_last_and_first() {
    let store = two_link_store();

    let last = lab_column(store.clone(), LinkSelection::Last, "job-last").await;
    assert_eq!(last.content, "Lab\npositive\n\"\"\n\"\"\nnegative\n");

    let first = lab_column(store, LinkSelection::First, "job-first").await;
    assert_eq!(first.content, "Lab\npositive\n\"\"\n\"\"\npositive\n");
}

#[tokio::test]
async fn test_strict_link_selection_fails_on_ambiguity() {
    let artifact = lab_column(two_link_store(), LinkSelection::Strict, "job-strict").await;

    assert_eq!(artifact.success_flag(), 0);
    assert_eq!(artifact.content, "");
    assert!(artifact.error.unwrap().contains("Ambiguous link"));
}

#[tokio::test]
async fn test_dry_run_skips_artifact_write() {
    let store = demo_store();
    let settings = ExportSettings {
        dry_run: true,
        ..ExportSettings::default()
    };

    let report = ExportCoordinator::new(context(store.clone()), settings)
        .run(&full_job("job-dry"))
        .await
        .unwrap();

    assert_eq!(report.artifact.success_flag(), 1);
    assert!(store
        .get_artifact(&JobId::new("job-dry").unwrap())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_second_run_of_same_job_cannot_overwrite() {
    let store = demo_store();
    let coordinator = ExportCoordinator::new(context(store.clone()), settings(200));

    coordinator.run(&full_job("job-once")).await.unwrap();
    assert!(coordinator.run(&full_job("job-once")).await.is_err());

    let stored = store
        .get_artifact(&JobId::new("job-once").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.success_flag(), 1);
}

#[tokio::test]
async fn test_checksum_matches_content() {
    let store = demo_store();
    let report = ExportCoordinator::new(context(store), settings(200))
        .run(&full_job("job-sum"))
        .await
        .unwrap();

    assert_eq!(
        report.summary.checksum.as_deref(),
        Some(catex::core::export::content_checksum(&report.artifact.content).as_str())
    );
}
