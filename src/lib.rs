// catex - categorical export engine
// Copyright (c) 2025 catex contributors
// Licensed under the MIT License

//! # catex - categorical export engine
//!
//! catex turns case records stored with sparse variable codes into tabular
//! downloads. A job names a primary form, a category of variables and an
//! ordered list of column descriptors; every case carrying at least one of the
//! category's codes becomes one CSV row, joined to its form submission and to
//! any linked submissions the descriptors reference.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Descriptor grammar, category filter, link plan, streaming
//!   cursor, projection and the export coordinator
//! - [`adapters`] - Store traits with PostgreSQL and in-memory implementations
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust
//! use catex::adapters::memory::MemoryStore;
//! use catex::core::calendar::ReferenceWeekdayCalendar;
//! use catex::core::export::{ExportContext, ExportCoordinator, ExportSettings};
//! use catex::core::links::LinkDefinitions;
//! use catex::domain::{
//!     CaseRecord, CategoryVariableDefinition, DescriptorSpec, ExportJob, FormName,
//!     FormSubmission, JobId, CategoryTag,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> catex::domain::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! store.add_variable(CategoryVariableDefinition::new("cmd_1", "Cholera", "A00").in_category("cd_tab"));
//! store.add_case(
//!     CaseRecord::new(1, "u1").with_variable("cmd_1", 1),
//!     "demo_case",
//!     FormSubmission::new("u1", json!({"pt./age": 31})),
//! );
//!
//! let context = ExportContext {
//!     source: store.clone(),
//!     catalog: store.clone(),
//!     locations: store.clone(),
//!     artifacts: store.clone(),
//!     links: Arc::new(LinkDefinitions::default()),
//!     calendar: Arc::new(ReferenceWeekdayCalendar::default()),
//! };
//! let job = ExportJob {
//!     job_id: JobId::generate(),
//!     form_name: FormName::new("demo_case").unwrap(),
//!     category: CategoryTag::new("cd_tab").unwrap(),
//!     output_name: "cd_report".to_string(),
//!     descriptors: vec![DescriptorSpec::new("pt./age", "Age")],
//! };
//!
//! let report = ExportCoordinator::new(context, ExportSettings::default())
//!     .run(&job)
//!     .await?;
//! assert_eq!(report.artifact.content, "Age\n31\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The library uses [`domain::CatexError`] for all errors.
//! [`domain::CatexError::is_configuration`] separates problems with the job
//! definition from failures of the store while a job runs.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
