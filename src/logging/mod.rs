//! Logging and observability
//!
//! Structured logging through `tracing`, with console output and optional
//! JSON log files with rotation.
//!
//! # Example
//!
//! ```no_run
//! use catex::logging::init_logging;
//! use catex::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(job_id = "job-1", "Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of an export job
///
/// # Example
///
/// ```no_run
/// use catex::log_job_start;
///
/// log_job_start!("job-1", "cd_tab", "demo_case");
/// ```
#[macro_export]
macro_rules! log_job_start {
    ($job_id:expr, $category:expr, $form:expr) => {
        tracing::info!(
            job_id = %$job_id,
            category = %$category,
            form = %$form,
            "Starting export job"
        );
    };
}

/// Log the end of an export job
///
/// # Example
///
/// ```no_run
/// use catex::log_job_complete;
/// use std::time::Duration;
///
/// log_job_complete!("job-1", "completed", 42, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_job_complete {
    ($job_id:expr, $outcome:expr, $rows:expr, $duration:expr) => {
        tracing::info!(
            job_id = %$job_id,
            outcome = %$outcome,
            rows = $rows,
            duration_ms = $duration.as_millis() as u64,
            "Export job finished"
        );
    };
}

/// Log a fetched batch
///
/// # Example
///
/// ```no_run
/// use catex::log_batch_fetched;
///
/// log_batch_fetched!(3, 600, 12, Some(1432_i64));
/// ```
#[macro_export]
macro_rules! log_batch_fetched {
    ($batch:expr, $fetched:expr, $included:expr, $last_id:expr) => {
        tracing::debug!(
            batch = $batch,
            rows_fetched = $fetched,
            rows_included = $included,
            last_id = ?$last_id,
            "Fetched batch"
        );
    };
}
