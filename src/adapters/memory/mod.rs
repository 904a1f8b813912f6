//! In-process stores
//!
//! [`MemoryStore`] serves fixture snapshots and tests; [`FileArtifactStore`]
//! keeps artifacts on the local filesystem.

pub mod artifacts;
pub mod snapshot;
pub mod store;

pub use artifacts::FileArtifactStore;
pub use snapshot::{LocationEntry, Snapshot};
pub use store::MemoryStore;
