//! Domain error types
//!
//! This module defines the error hierarchy for catex. Errors are split the way
//! an export job needs to treat them: configuration problems that are detected
//! before any row is streamed, and runtime failures raised by the storage
//! collaborators while a job is in flight.

use thiserror::Error;

/// Main catex error type
///
/// This is the primary error type used throughout the library. Callers that
/// need to decide between "fix the job definition" and "the store let us down"
/// should use [`CatexError::is_configuration`].
#[derive(Debug, Error)]
pub enum CatexError {
    /// Configuration-related errors (config file, job file, link plan)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Descriptor grammar errors
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// A descriptor references a link name with no link definition
    #[error("Unknown link '{0}': no link definition targets a form for it")]
    UnknownLink(String),

    /// Storage collaborator errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Location lookup could not be loaded
    #[error("Location lookup error: {0}")]
    Location(String),

    /// A case holds several link targets under one name and the policy is strict
    #[error("Ambiguous link '{link}' on case {case_id}: {count} targets")]
    AmbiguousLink {
        link: String,
        case_id: i64,
        count: usize,
    },

    /// Artifact persistence errors
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// A batch fetch exceeded its time budget
    #[error("Batch fetch timed out after {0} seconds")]
    Timeout(u64),

    /// The job was cancelled by the scheduler
    #[error("Job cancelled: {0}")]
    Cancelled(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl CatexError {
    /// Returns true for errors that stem from the job or configuration itself
    ///
    /// These are detected before streaming starts and cannot be fixed by
    /// retrying the job unchanged.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CatexError::Configuration(_)
                | CatexError::Descriptor(_)
                | CatexError::UnknownLink(_)
                | CatexError::Validation(_)
        )
    }
}

/// Descriptor grammar errors
///
/// Every variant is fatal for the whole job: a malformed descriptor cannot be
/// resolved row by row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Empty source expression
    #[error("descriptor for '{0}' has an empty source expression")]
    Empty(String),

    /// Output key missing or blank
    #[error("descriptor '{0}' has an empty output key")]
    EmptyOutputKey(String),

    /// The same output key appears twice
    #[error("output key '{0}' is used by more than one descriptor")]
    DuplicateOutputKey(String),

    /// Code list and label list lengths differ
    #[error("'{expression}': {codes} codes but {labels} labels")]
    CodeArityMismatch {
        expression: String,
        codes: usize,
        labels: usize,
    },

    /// Wrong number of `$`-separated parts for the directive
    #[error("'{expression}': {directive} expects {expected}")]
    WrongArity {
        expression: String,
        directive: &'static str,
        expected: &'static str,
    },

    /// The translate payload is not a valid mapping literal
    #[error("'{expression}': invalid translate mapping: {reason}")]
    InvalidTranslate { expression: String, reason: String },

    /// A bare field name containing `:` that is not a `value:` literal
    #[error("'{0}': ':' is reserved for the value: form")]
    ReservedColon(String),

    /// Expression does not match any known directive
    #[error("'{0}': unrecognised descriptor")]
    Unrecognised(String),
}

/// Storage collaborator errors
///
/// These errors don't expose third-party driver types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the store
    #[error("Failed to connect: {0}")]
    ConnectionFailed(String),

    /// A query or cursor fetch failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A row could not be decoded into a domain type
    #[error("Malformed row: {0}")]
    MalformedRow(String),

    /// Requested form has no backing table
    #[error("Unknown form: {0}")]
    UnknownForm(String),

    /// An artifact already exists for this job
    #[error("Artifact already written for job {0}")]
    AlreadyWritten(String),
}

impl From<std::io::Error> for CatexError {
    fn from(err: std::io::Error) -> Self {
        CatexError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CatexError {
    fn from(err: serde_json::Error) -> Self {
        CatexError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CatexError {
    fn from(err: toml::de::Error) -> Self {
        CatexError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<csv::Error> for CatexError {
    fn from(err: csv::Error) -> Self {
        CatexError::Serialization(format!("CSV write error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catex_error_display() {
        let err = CatexError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_descriptor_error_conversion() {
        let err: CatexError = DescriptorError::Unrecognised("a$b$c".to_string()).into();
        assert!(matches!(err, CatexError::Descriptor(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_store_error_is_not_configuration() {
        let err: CatexError = StoreError::QueryFailed("connection reset".to_string()).into();
        assert!(matches!(err, CatexError::Store(_)));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_unknown_link_is_configuration() {
        assert!(CatexError::UnknownLink("alert_investigation".to_string()).is_configuration());
        assert!(!CatexError::Timeout(30).is_configuration());
        assert!(!CatexError::Cancelled("shutdown".to_string()).is_configuration());
    }

    #[test]
    fn test_code_arity_message() {
        let err = DescriptorError::CodeArityMismatch {
            expression: "code$a,b$X".to_string(),
            codes: 2,
            labels: 1,
        };
        assert_eq!(err.to_string(), "'code$a,b$X': 2 codes but 1 labels");
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: CatexError = toml_err.into();
        assert!(matches!(err, CatexError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: CatexError = json_err.into();
        assert!(matches!(err, CatexError::Serialization(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: CatexError = io_err.into();
        assert!(matches!(err, CatexError::Io(_)));
    }
}
