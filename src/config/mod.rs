//! Configuration management for catex.
//!
//! TOML configuration files with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CATEX_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation with descriptive messages
//!
//! # Example Configuration
//!
//! ```toml
//! store_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [postgresql]
//! connection_string = "${CATEX_DATABASE_URL}"
//! max_connections = 10
//!
//! [export]
//! batch_size = 200
//! batch_timeout_seconds = 300
//! link_selection = "last"
//! epi_week_start_day = "monday"
//!
//! [links]
//! file = "links.json"
//!
//! [[links.definitions]]
//! name = "alert_investigation"
//! from_form = "demo_case"
//! to_form = "demo_alert"
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use catex::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("catex.toml")?;
//! println!("Batch size: {}", config.export.batch_size);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_str};
pub use schema::{
    ApplicationConfig, CatexConfig, ExportConfig, FixtureConfig, LinksConfig, LoggingConfig,
    PostgreSQLConfig, StoreTarget,
};
pub use secret::{secret_string, SecretString, SecretValue};
