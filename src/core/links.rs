//! Link resolution
//!
//! Maps the link names referenced by `gen_link` columns to the forms they
//! target and assigns each distinct link one join slot. Slots are stable for
//! the whole job: the first link named in the column list gets slot 0.

use crate::core::descriptor::{referenced_links, Column};
use crate::domain::{CaseRecord, CatexError, FormName, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Resolves a link name to the form whose submissions it points at
pub trait LinkCatalog: Send + Sync {
    fn resolve_link_target(&self, link: &str) -> Option<FormName>;
}

/// A named link from one form to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDefinition {
    pub name: String,

    #[serde(default)]
    pub from_form: Option<FormName>,

    pub to_form: FormName,
}

/// Link definitions keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDefinitions {
    by_name: BTreeMap<String, LinkDefinition>,
}

impl LinkDefinitions {
    pub fn new(definitions: impl IntoIterator<Item = LinkDefinition>) -> Self {
        let mut links = Self::default();
        links.extend(definitions);
        links
    }

    /// Loads a JSON array of link definitions
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatexError::Configuration(format!(
                "Failed to read links file {}: {}",
                path.display(),
                e
            ))
        })?;
        let definitions: Vec<LinkDefinition> = serde_json::from_str(&content).map_err(|e| {
            CatexError::Configuration(format!(
                "Failed to parse links file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(definitions))
    }

    /// Adds definitions; a later definition replaces an earlier one of the same name
    pub fn extend(&mut self, definitions: impl IntoIterator<Item = LinkDefinition>) {
        for def in definitions {
            self.by_name.insert(def.name.clone(), def);
        }
    }

    pub fn get(&self, name: &str) -> Option<&LinkDefinition> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl LinkCatalog for LinkDefinitions {
    fn resolve_link_target(&self, link: &str) -> Option<FormName> {
        self.get(link).map(|def| def.to_form.clone())
    }
}

/// Which target to use when a case holds several under one link name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkSelection {
    First,
    /// Most recently appended target
    #[default]
    Last,
    /// Several targets fail the job
    Strict,
}

impl LinkSelection {
    /// Picks the target uuid for `link` on `case`
    ///
    /// # Errors
    ///
    /// [`CatexError::AmbiguousLink`] under [`LinkSelection::Strict`] when the
    /// case holds more than one target.
    pub fn select<'a>(&self, case: &'a CaseRecord, link: &str) -> Result<Option<&'a str>> {
        let targets = case.link_targets(link);
        match self {
            LinkSelection::First => Ok(targets.first().map(String::as_str)),
            LinkSelection::Last => Ok(targets.last().map(String::as_str)),
            LinkSelection::Strict => match targets {
                [] => Ok(None),
                [only] => Ok(Some(only.as_str())),
                many => Err(CatexError::AmbiguousLink {
                    link: link.to_string(),
                    case_id: case.id,
                    count: many.len(),
                }),
            },
        }
    }
}

impl fmt::Display for LinkSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkSelection::First => write!(f, "first"),
            LinkSelection::Last => write!(f, "last"),
            LinkSelection::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for LinkSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(LinkSelection::First),
            "last" => Ok(LinkSelection::Last),
            "strict" => Ok(LinkSelection::Strict),
            other => Err(format!(
                "link_selection must be one of first, last, strict (got '{other}')"
            )),
        }
    }
}

/// One left outer join of the primary query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkJoin {
    pub link: String,
    pub target_form: FormName,
    pub slot: usize,
}

/// The joins a job needs, one per distinct referenced link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    joins: Vec<LinkJoin>,
    slots: HashMap<String, usize>,
}

impl JoinPlan {
    /// Builds the plan for `columns`
    ///
    /// # Errors
    ///
    /// [`CatexError::UnknownLink`] if a referenced link has no definition.
    pub fn resolve(columns: &[Column], catalog: &dyn LinkCatalog) -> Result<Self> {
        let mut plan = Self::default();
        for link in referenced_links(columns) {
            let target_form = catalog
                .resolve_link_target(link)
                .ok_or_else(|| CatexError::UnknownLink(link.to_string()))?;
            let slot = plan.joins.len();
            plan.slots.insert(link.to_string(), slot);
            plan.joins.push(LinkJoin {
                link: link.to_string(),
                target_form,
                slot,
            });
        }
        Ok(plan)
    }

    pub fn slot(&self, link: &str) -> Option<usize> {
        self.slots.get(link).copied()
    }

    /// Joins in slot order
    pub fn joins(&self) -> &[LinkJoin] {
        &self.joins
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }
}
