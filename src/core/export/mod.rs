//! Export orchestration
//!
//! - [`coordinator`] - runs a job from descriptors to artifact
//! - [`sink`] - CSV accumulation and the single artifact write
//! - [`summary`] - per-job summary and checksum

pub mod coordinator;
pub mod sink;
pub mod summary;

pub use coordinator::{ExportContext, ExportCoordinator, ExportReport, ExportSettings};
pub use sink::{ArtifactSink, CsvSink};
pub use summary::{content_checksum, ExportSummary, JobOutcome};
