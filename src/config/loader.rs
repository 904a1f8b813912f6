//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{CatexConfig, StoreTarget};
use crate::config::secret_string;
use crate::domain::errors::CatexError;
use crate::domain::result::Result;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CatexConfig
/// 4. Applies environment variable overrides (CATEX_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use catex::config::loader::load_config;
///
/// let config = load_config("catex.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CatexConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CatexError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CatexError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_str(&contents)
}

/// Same as [`load_config`] for TOML text already in memory
pub fn load_config_str(contents: &str) -> Result<CatexConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: CatexConfig = toml::from_str(&contents)
        .map_err(|e| CatexError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        CatexError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| CatexError::Configuration(format!("Invalid substitution pattern: {}", e)))?;
    let mut missing: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            re.replace_all(line, |caps: &Captures<'_>| match std::env::var(&caps[1]) {
                Ok(value) => value,
                Err(_) => {
                    if !missing.iter().any(|v| v == &caps[1]) {
                        missing.push(caps[1].to_string());
                    }
                    caps[0].to_string()
                }
            })
            .into_owned()
        })
        .collect();

    if !missing.is_empty() {
        return Err(CatexError::Configuration(format!(
            "Missing required environment variables: {}",
            missing.join(", ")
        )));
    }

    let mut result = lines.join("\n");
    result.push('\n');
    Ok(result)
}

/// Parses an override value, failing with the variable name on bad input
fn parse_override<T: std::str::FromStr>(name: &str, val: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    val.parse().map_err(|e: T::Err| {
        CatexError::Configuration(format!("Invalid value '{}' for {}: {}", val, name, e))
    })
}

/// Applies environment variable overrides using the CATEX_* prefix
///
/// Environment variables follow the pattern: CATEX_<SECTION>_<KEY>
/// For example: CATEX_EXPORT_BATCH_SIZE, CATEX_POSTGRESQL_CONNECTION_STRING
fn apply_env_overrides(config: &mut CatexConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("CATEX_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("CATEX_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CATEX_STORE_TARGET") {
        config.store_target = match val.to_lowercase().as_str() {
            "postgresql" => StoreTarget::PostgreSQL,
            "fixture" => StoreTarget::Fixture,
            _ => {
                return Err(CatexError::Configuration(format!(
                    "Invalid CATEX_STORE_TARGET '{}': expected postgresql or fixture",
                    val
                )))
            }
        };
    }

    // Export overrides
    if let Ok(val) = std::env::var("CATEX_EXPORT_BATCH_SIZE") {
        config.export.batch_size = parse_override("CATEX_EXPORT_BATCH_SIZE", &val)?;
    }
    if let Ok(val) = std::env::var("CATEX_EXPORT_BATCH_TIMEOUT_SECONDS") {
        config.export.batch_timeout_seconds =
            parse_override("CATEX_EXPORT_BATCH_TIMEOUT_SECONDS", &val)?;
    }
    if let Ok(val) = std::env::var("CATEX_EXPORT_LINK_SELECTION") {
        config.export.link_selection = parse_override("CATEX_EXPORT_LINK_SELECTION", &val)?;
    }
    if let Ok(val) = std::env::var("CATEX_EXPORT_EPI_WEEK_START_DAY") {
        config.export.epi_week_start_day = val;
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("CATEX_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("CATEX_POSTGRESQL_MAX_CONNECTIONS") {
            pg_config.max_connections = parse_override("CATEX_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
        if let Ok(val) = std::env::var("CATEX_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS") {
            pg_config.statement_timeout_seconds =
                parse_override("CATEX_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS", &val)?;
        }
    }

    // Fixture overrides
    if let Some(ref mut fixture) = config.fixture {
        if let Ok(val) = std::env::var("CATEX_FIXTURE_SNAPSHOT_PATH") {
            fixture.snapshot_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CATEX_FIXTURE_ARTIFACT_DIR") {
            fixture.artifact_dir = PathBuf::from(val);
        }
    }

    // Links overrides
    if let Ok(val) = std::env::var("CATEX_LINKS_FILE") {
        config.links.file = Some(PathBuf::from(val));
    }

    // Logging overrides
    if let Ok(val) = std::env::var("CATEX_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CATEX_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
