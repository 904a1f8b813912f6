//! PostgreSQL store integration
//!
//! Cases live in the `data` table and are joined to one table per form by
//! submission uuid. Catalog tables and the artifact table are created by
//! [`PostgreSQLClient::ensure_schema`].

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgresStore;
pub use client::PostgreSQLClient;
