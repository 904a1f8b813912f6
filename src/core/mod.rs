//! Core pipeline of catex.
//!
//! # Modules
//!
//! - [`descriptor`] - Descriptor grammar and parsed column plans
//! - [`category`] - Category filter and icd name indexes
//! - [`links`] - Link definitions, selection policy and join plans
//! - [`cursor`] - Streaming keyset cursor over the joined rows
//! - [`calendar`] - Date parsing and epi weeks
//! - [`locations`] - Location name lookup
//! - [`projector`] - Per-row column evaluation
//! - [`export`] - Job orchestration, sink and summary
//!
//! # Job Workflow
//!
//! 1. **Parse**: descriptors become typed columns; a bad descriptor fails the job
//! 2. **Filter**: the category's variable codes form the inclusion predicate;
//!    an empty category short-circuits to an unsuccessful artifact
//! 3. **Plan joins**: each referenced link gets one left outer join slot
//! 4. **Stream**: batches of joined rows in ascending case id order
//! 5. **Project**: one cell per column, unresolvable values are empty
//! 6. **Commit**: exactly one artifact write per job
//!
//! # Example
//!
//! ```rust,no_run
//! use catex::adapters::memory::MemoryStore;
//! use catex::core::calendar::ReferenceWeekdayCalendar;
//! use catex::core::export::{ExportContext, ExportCoordinator, ExportSettings};
//! use catex::core::links::LinkDefinitions;
//! use catex::domain::ExportJob;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::from_snapshot_file("fixtures/demo.json")?);
//! let context = ExportContext {
//!     source: store.clone(),
//!     catalog: store.clone(),
//!     locations: store.clone(),
//!     artifacts: store.clone(),
//!     links: Arc::new(LinkDefinitions::default()),
//!     calendar: Arc::new(ReferenceWeekdayCalendar::default()),
//! };
//!
//! let job = ExportJob::from_file("jobs/cd_report.json")?;
//! let report = ExportCoordinator::new(context, ExportSettings::default())
//!     .run(&job)
//!     .await?;
//! println!("{} rows", report.summary.rows_exported);
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod category;
pub mod cursor;
pub mod descriptor;
pub mod export;
pub mod links;
pub mod locations;
pub mod projector;
