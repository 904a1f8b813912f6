//! Export job invocation
//!
//! The scheduler hands over `(jobId, formName, category, outputName,
//! descriptors)`. Jobs can also be read from a JSON or TOML file for the CLI.

use crate::domain::errors::CatexError;
use crate::domain::ids::{CategoryTag, FormName, JobId};
use crate::domain::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One requested output column: `(sourceExpression, outputKey)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct DescriptorSpec {
    pub source: String,
    pub output_key: String,
}

impl DescriptorSpec {
    pub fn new(source: impl Into<String>, output_key: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output_key: output_key.into(),
        }
    }
}

impl From<(String, String)> for DescriptorSpec {
    fn from((source, output_key): (String, String)) -> Self {
        Self { source, output_key }
    }
}

impl From<DescriptorSpec> for (String, String) {
    fn from(spec: DescriptorSpec) -> Self {
        (spec.source, spec.output_key)
    }
}

/// A categorical export job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportJob {
    pub job_id: JobId,

    /// Primary form joined 1:1 to each case by uuid
    pub form_name: FormName,

    /// Category whose variable codes decide row inclusion
    pub category: CategoryTag,

    /// Report name stored as the artifact type
    pub output_name: String,

    /// Output columns, in output order
    pub descriptors: Vec<DescriptorSpec>,
}

impl ExportJob {
    /// Loads a job definition from a `.json` or `.toml` file
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CatexError::Configuration(format!(
                "Failed to read job file {}: {}",
                path.display(),
                e
            ))
        })?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Ok(toml::from_str(&contents)?)
        } else {
            serde_json::from_str(&contents).map_err(|e| {
                CatexError::Configuration(format!(
                    "Failed to parse job file {}: {}",
                    path.display(),
                    e
                ))
            })
        }
    }

    /// Output keys in descriptor order (the header row)
    pub fn output_keys(&self) -> Vec<&str> {
        self.descriptors
            .iter()
            .map(|d| d.output_key.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const JOB_JSON: &str = r#"{
        "job_id": "job-42",
        "form_name": "demo_case",
        "category": "cd_tab",
        "output_name": "communicable_diseases",
        "descriptors": [
            ["icd_name$cd_tab", "Disease"],
            ["code$gen_1,gen_2$Male,Female$Unknown", "Gender"]
        ]
    }"#;

    #[test]
    fn test_job_from_json() {
        let job: ExportJob = serde_json::from_str(JOB_JSON).unwrap();
        assert_eq!(job.job_id.as_str(), "job-42");
        assert_eq!(job.output_keys(), vec!["Disease", "Gender"]);
        assert_eq!(job.descriptors[1].source, "code$gen_1,gen_2$Male,Female$Unknown");
    }

    #[test]
    fn test_job_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            br#"
job_id = "job-43"
form_name = "demo_case"
category = "cd_tab"
output_name = "cd"
descriptors = [["region", "Region"], ["value:1", "Count"]]
"#,
        )
        .unwrap();

        let job = ExportJob::from_file(file.path()).unwrap();
        assert_eq!(job.form_name.as_str(), "demo_case");
        assert_eq!(job.output_keys(), vec!["Region", "Count"]);
    }

    #[test]
    fn test_job_rejects_invalid_form_name() {
        let json = JOB_JSON.replace("demo_case", "demo case");
        assert!(serde_json::from_str::<ExportJob>(&json).is_err());
    }

    #[test]
    fn test_job_missing_file() {
        let err = ExportJob::from_file("does-not-exist.json").unwrap_err();
        assert!(err.is_configuration());
    }
}
