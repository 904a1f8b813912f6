//! Export coordinator - runs one export job end to end
//!
//! Parses descriptors, resolves the category and links, streams joined rows
//! batch by batch through the projector into the CSV sink, and finishes with
//! exactly one artifact write whatever the outcome.

use crate::adapters::store::{ArtifactStore, CaseSource, LocationDirectory, VariableCatalog};
use crate::config::ExportConfig;
use crate::core::calendar::EpiWeekCalendar;
use crate::core::category::{build_icd_indexes, resolve_category};
use crate::core::cursor::{JoinCursor, JoinQuery};
use crate::core::descriptor::parse_columns;
use crate::core::export::sink::{ArtifactSink, CsvSink};
use crate::core::export::summary::{ExportSummary, JobOutcome};
use crate::core::links::{JoinPlan, LinkCatalog, LinkSelection};
use crate::core::projector::RowProjector;
use crate::domain::{CatexError, ExportArtifact, ExportJob, Result};
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// The collaborators a job runs against
#[derive(Clone)]
pub struct ExportContext {
    pub source: Arc<dyn CaseSource>,
    pub catalog: Arc<dyn VariableCatalog>,
    pub locations: Arc<dyn LocationDirectory>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub links: Arc<dyn LinkCatalog>,
    pub calendar: Arc<dyn EpiWeekCalendar>,
}

/// Tunables of the streaming pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub batch_size: usize,
    pub batch_timeout: Option<Duration>,
    pub link_selection: LinkSelection,
    pub dry_run: bool,
}

impl ExportSettings {
    pub fn from_config(config: &ExportConfig, dry_run: bool) -> Self {
        Self {
            batch_size: config.batch_size,
            batch_timeout: config.batch_timeout(),
            link_selection: config.link_selection,
            dry_run,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default(), false)
    }
}

/// What a finished job hands back
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub summary: ExportSummary,
    pub artifact: ExportArtifact,
}

/// How the pipeline ended before the artifact is written
enum PipelineResult {
    Completed(String),
    EmptyCategory,
}

/// Export coordinator
pub struct ExportCoordinator {
    context: ExportContext,
    settings: ExportSettings,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ExportCoordinator {
    pub fn new(context: ExportContext, settings: ExportSettings) -> Self {
        Self {
            context,
            settings,
            shutdown: None,
        }
    }

    /// Cancels the running job when the signal turns `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Runs `job` and writes its artifact
    ///
    /// Job failures (bad descriptors, unknown links, store errors, timeouts,
    /// cancellation) are reported through a failed artifact and the summary.
    ///
    /// # Errors
    ///
    /// Returns an error only when the artifact itself cannot be written.
    pub async fn run(&self, job: &ExportJob) -> Result<ExportReport> {
        let start_time = Instant::now();
        let mut summary = ExportSummary::new(job.job_id.clone(), job.category.clone());

        crate::log_job_start!(job.job_id, job.category, job.form_name);

        let sink = ArtifactSink::new(
            self.context.artifacts.clone(),
            job.job_id.clone(),
            &job.output_name,
            self.settings.dry_run,
        );

        let artifact = match self.execute(job, &mut summary).await {
            Ok(PipelineResult::Completed(content)) => {
                summary.outcome = JobOutcome::Completed;
                sink.complete(content).await?
            }
            Ok(PipelineResult::EmptyCategory) => {
                tracing::warn!(
                    job_id = %job.job_id,
                    category = %job.category,
                    "No variables in category, skipping export"
                );
                summary.outcome = JobOutcome::EmptyCategory;
                sink.empty_category().await?
            }
            Err(e) => {
                summary.outcome = if e.is_configuration() {
                    JobOutcome::ConfigurationFailed
                } else {
                    JobOutcome::Failed
                };
                summary.error = Some(e.to_string());
                tracing::error!(job_id = %job.job_id, error = %e, "Export job failed");
                sink.fail(&e).await?
            }
        };

        summary.record_artifact(&artifact);
        let summary = summary.with_duration(start_time.elapsed());
        crate::log_job_complete!(
            job.job_id,
            summary.outcome,
            summary.rows_exported,
            summary.duration
        );
        summary.log_summary();

        Ok(ExportReport { summary, artifact })
    }

    async fn execute(&self, job: &ExportJob, summary: &mut ExportSummary) -> Result<PipelineResult> {
        let columns = parse_columns(&job.descriptors)?;

        let filter = resolve_category(self.context.catalog.as_ref(), &job.category).await?;
        if filter.is_empty() {
            return Ok(PipelineResult::EmptyCategory);
        }

        let plan = JoinPlan::resolve(&columns, self.context.links.as_ref())?;
        let icd_indexes =
            build_icd_indexes(self.context.catalog.as_ref(), &filter, &columns).await?;

        let locations = self
            .context
            .locations
            .load_locations()
            .await
            .map_err(|e| CatexError::Location(e.to_string()))?;

        tracing::debug!(
            job_id = %job.job_id,
            columns = columns.len(),
            codes = filter.predicate.len(),
            joins = plan.len(),
            locations = locations.len(),
            "Job plan ready"
        );

        let query = JoinQuery {
            form: job.form_name.clone(),
            joins: plan.joins().to_vec(),
            inclusion: filter.predicate.clone(),
            link_selection: self.settings.link_selection,
        };
        let projector = RowProjector::new(
            columns,
            plan,
            Arc::new(locations),
            icd_indexes,
            self.context.calendar.clone(),
        );
        let mut table = CsvSink::new(&projector.header())?;

        let mut batches =
            JoinCursor::new(self.context.source.clone(), query, self.settings.batch_size)
                .with_fetch_timeout(self.settings.batch_timeout)
                .into_batches();

        loop {
            self.check_shutdown()?;

            let next = match self.shutdown.clone() {
                Some(mut shutdown) => {
                    tokio::select! {
                        next = batches.try_next() => next?,
                        _ = wait_for_shutdown(&mut shutdown) => {
                            return Err(CatexError::Cancelled("shutdown requested".to_string()));
                        }
                    }
                }
                None => batches.try_next().await?,
            };
            let Some((batch, stats)) = next else { break };

            for group in &batch {
                table.write_row(&projector.project(group))?;
            }

            summary.batches = stats.batches;
            summary.rows_scanned = stats.rows_fetched;
            summary.rows_exported = table.rows_written();
        }

        Ok(PipelineResult::Completed(table.finish()?))
    }

    fn check_shutdown(&self) -> Result<()> {
        match &self.shutdown {
            Some(shutdown) if *shutdown.borrow() => {
                Err(CatexError::Cancelled("shutdown requested".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Resolves once the signal is `true`; never resolves if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
