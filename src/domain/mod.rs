//! Domain models and types for catex.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`], [`FormName`], [`CategoryTag`])
//! - **Source data** ([`CaseRecord`], [`FormSubmission`], [`RowGroup`],
//!   [`CategoryVariableDefinition`])
//! - **Job input and output** ([`ExportJob`], [`ExportArtifact`])
//! - **Error types** ([`CatexError`], [`DescriptorError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Example
//!
//! ```rust
//! use catex::domain::{CaseRecord, JobId, ExportArtifact};
//!
//! let case = CaseRecord::new(1, "uuid:1").with_variable("tot_1", 1);
//! assert!(case.has_variable("tot_1"));
//!
//! let artifact = ExportArtifact::empty_category(JobId::generate(), "cd_report");
//! assert_eq!(artifact.success_flag(), 0);
//! ```

pub mod artifact;
pub mod case;
pub mod errors;
pub mod ids;
pub mod job;
pub mod result;
pub mod variable;

pub use artifact::{ArtifactStatus, ExportArtifact};
pub use case::{CaseRecord, FormSubmission, RowGroup};
pub use errors::{CatexError, DescriptorError, StoreError};
pub use ids::{CategoryTag, FormName, JobId};
pub use job::{DescriptorSpec, ExportJob};
pub use result::Result;
pub use variable::CategoryVariableDefinition;
