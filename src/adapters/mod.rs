//! External system integrations for catex.
//!
//! - [`store`] - Storage traits the export pipeline depends on, and the factory
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - In-memory store loaded from JSON snapshots, plus a
//!   filesystem artifact store
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind the traits in [`store`], so
//! the pipeline runs unchanged against a database or a test fixture.
//!
//! ```rust
//! use catex::adapters::memory::MemoryStore;
//! use catex::adapters::store::LocationDirectory;
//!
//! # async fn example() -> catex::domain::Result<()> {
//! let store = MemoryStore::new();
//! store.add_location(1, "Demo");
//! assert_eq!(store.load_locations().await?.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgresql;
pub mod store;
