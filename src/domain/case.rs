//! Case records, form submissions and joined row-groups
//!
//! A [`CaseRecord`] is one reported event with sparse coded variables. It
//! correlates 1:1 with the [`FormSubmission`] of its originating form through
//! the shared `uuid`, and may point at further submissions through named links.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One reported event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Store-assigned row id; the streaming cursor pages by it
    pub id: i64,

    /// Correlation key shared with the primary form submission
    pub uuid: String,

    #[serde(default)]
    pub country: Option<i64>,

    #[serde(default)]
    pub region: Option<i64>,

    /// Absent for clinics that sit directly under a region
    #[serde(default)]
    pub district: Option<i64>,

    #[serde(default)]
    pub clinic: Option<i64>,

    #[serde(default)]
    pub clinic_type: Option<String>,

    #[serde(default)]
    pub geolocation: Option<String>,

    #[serde(default)]
    pub date: Option<NaiveDateTime>,

    /// Sparse mapping from variable code to its count
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    /// Named links to other submissions, oldest target first
    #[serde(default, deserialize_with = "deserialize_links")]
    pub links: BTreeMap<String, Vec<String>>,
}

impl CaseRecord {
    /// Creates a case with no location, date, variables or links
    pub fn new(id: i64, uuid: impl Into<String>) -> Self {
        Self {
            id,
            uuid: uuid.into(),
            country: None,
            region: None,
            district: None,
            clinic: None,
            clinic_type: None,
            geolocation: None,
            date: None,
            variables: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    /// Sets a variable code (builder style, handy for fixtures)
    pub fn with_variable(mut self, code: impl Into<String>, count: impl Into<Value>) -> Self {
        self.variables.insert(code.into(), count.into());
        self
    }

    /// Appends a link target under `name`
    pub fn with_link(mut self, name: impl Into<String>, target_uuid: impl Into<String>) -> Self {
        self.links
            .entry(name.into())
            .or_default()
            .push(target_uuid.into());
        self
    }

    /// Returns true if the case carries `code` among its variables
    pub fn has_variable(&self, code: &str) -> bool {
        self.variables.contains_key(code)
    }

    /// All link targets stored under `name`, oldest first
    pub fn link_targets(&self, name: &str) -> &[String] {
        self.links.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Free-form payload of one form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub uuid: String,

    #[serde(default)]
    pub data: Map<String, Value>,
}

impl FormSubmission {
    /// Creates a submission from a JSON object; non-object payloads become empty
    pub fn new(uuid: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            uuid: uuid.into(),
            data,
        }
    }

    /// Looks up a field in the payload, treating JSON null as absent
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }
}

/// One joined row-group as surfaced by the streaming cursor
///
/// `linked` is indexed by join-plan slot; `None` marks an unresolved link.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub case: CaseRecord,
    pub form: FormSubmission,
    pub linked: Vec<Option<FormSubmission>>,
}

impl RowGroup {
    /// The linked submission in `slot`, if the link resolved
    pub fn linked(&self, slot: usize) -> Option<&FormSubmission> {
        self.linked.get(slot).and_then(Option::as_ref)
    }
}

/// Accepts either a single target uuid or a list of them per link name
pub(crate) fn deserialize_links<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Targets {
        One(String),
        Many(Vec<String>),
    }

    let raw: Option<BTreeMap<String, Targets>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, targets)| {
            let targets = match targets {
                Targets::One(uuid) => vec![uuid],
                Targets::Many(uuids) => uuids,
            };
            (name, targets)
        })
        .collect())
}
