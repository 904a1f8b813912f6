//! Store abstraction layer
//!
//! Trait-based access to cases, variable definitions, locations and export
//! artifacts, so the pipeline can run against PostgreSQL or an in-memory
//! fixture.

pub mod factory;
pub mod traits;

pub use factory::{create_artifact_store, create_store, StoreSet};
pub use traits::{ArtifactStore, CaseSource, LocationDirectory, VariableCatalog};
