//! JSON snapshot format for fixture stores
//!
//! ```json
//! {
//!   "locations": [{"id": 1, "name": "Demo"}],
//!   "variables": [{"id": "mlp_1", "name": "Malaria", "condition": "B54", "category": ["cd_tab"]}],
//!   "cases": [{"id": 1, "uuid": "uuid:1", "variables": {"mlp_1": 1}}],
//!   "forms": {"demo_case": [{"uuid": "uuid:1", "data": {"pt./age": 31}}]}
//! }
//! ```

use crate::domain::{CaseRecord, CatexError, CategoryVariableDefinition, FormSubmission, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub id: i64,
    pub name: String,
}

/// Everything a fixture store holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub locations: Vec<LocationEntry>,

    #[serde(default)]
    pub variables: Vec<CategoryVariableDefinition>,

    #[serde(default)]
    pub cases: Vec<CaseRecord>,

    /// Form submissions keyed by form name
    #[serde(default)]
    pub forms: BTreeMap<String, Vec<FormSubmission>>,
}

impl Snapshot {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatexError::Configuration(format!(
                "Failed to read snapshot {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CatexError::Configuration(format!(
                "Failed to parse snapshot {}: {}",
                path.display(),
                e
            ))
        })
    }
}
