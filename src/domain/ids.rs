//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers an export job carries. Each type
//! validates on construction so the rest of the engine can rely on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Export job identifier
///
/// Supplied by the scheduler; also used as the artifact key.
///
/// # Examples
///
/// ```
/// use catex::domain::ids::JobId;
/// use std::str::FromStr;
///
/// let job_id = JobId::from_str("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap();
/// assert_eq!(job_id.as_str(), "7d44b88c-4199-4bad-97dc-d78268e01398");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Creates a new JobId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Job ID cannot be empty".to_string());
        }
        if id.contains(['/', '\\']) {
            return Err(format!("Job ID '{id}' cannot contain path separators"));
        }
        Ok(Self(id))
    }

    /// Generates a fresh random job ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the job ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Form name newtype wrapper
///
/// A form name doubles as the backing table name in the store, so it is
/// restricted to `[A-Za-z_][A-Za-z0-9_]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FormName(String);

impl FormName {
    /// Creates a new FormName, rejecting anything that is not a plain identifier
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if !valid_head || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!(
                "Invalid form name '{name}'. Must match [A-Za-z_][A-Za-z0-9_]*"
            ));
        }
        Ok(Self(name))
    }

    /// Returns the form name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Category tag newtype wrapper
///
/// Names a grouping of variable codes, e.g. `cd_tab` or `mental_health`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryTag(String);

impl CategoryTag {
    /// Creates a new CategoryTag from a string
    pub fn new(tag: impl Into<String>) -> Result<Self, String> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err("Category tag cannot be empty".to_string());
        }
        Ok(Self(tag))
    }

    /// Returns the tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_id_impls {
    ($($ty:ident),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $ty {
                type Err = String;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Self::new(s)
                }
            }

            impl TryFrom<String> for $ty {
                type Error = String;

                fn try_from(s: String) -> Result<Self, Self::Error> {
                    Self::new(s)
                }
            }

            impl From<$ty> for String {
                fn from(id: $ty) -> String {
                    id.0
                }
            }

            impl AsRef<str> for $ty {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )+
    };
}

string_id_impls!(JobId, FormName, CategoryTag);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_creation() {
        let id = JobId::new("job-123").unwrap();
        assert_eq!(id.as_str(), "job-123");
    }

    #[test]
    fn test_job_id_rejects_empty_and_paths() {
        assert!(JobId::new("").is_err());
        assert!(JobId::new("   ").is_err());
        assert!(JobId::new("../etc/passwd").is_err());
    }

    #[test]
    fn test_job_id_generate_is_unique() {
        assert_ne!(JobId::generate(), JobId::generate());
    }

    #[test]
    fn test_form_name_validation() {
        assert!(FormName::new("demo_case").is_ok());
        assert!(FormName::new("_alert2").is_ok());
        assert!(FormName::new("").is_err());
        assert!(FormName::new("2forms").is_err());
        assert!(FormName::new("demo_case; DROP TABLE data").is_err());
    }

    #[test]
    fn test_category_tag_display() {
        let tag = CategoryTag::new("cd_tab").unwrap();
        assert_eq!(format!("{}", tag), "cd_tab");
    }

    #[test]
    fn test_ids_deserialize_with_validation() {
        let form: FormName = serde_json::from_str("\"demo_case\"").unwrap();
        assert_eq!(form.as_str(), "demo_case");
        assert!(serde_json::from_str::<FormName>("\"bad name\"").is_err());
        assert!(serde_json::from_str::<JobId>("\"\"").is_err());
    }
}
