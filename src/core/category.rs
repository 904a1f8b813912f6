//! Category filter
//!
//! Resolves which variable codes belong to a category and builds the
//! row-inclusion predicate: a case is exported iff at least one of its variable
//! codes is in the category's code set. Also builds the raw-code to display-name
//! indexes used by `icd_name` columns.

use crate::adapters::store::VariableCatalog;
use crate::core::descriptor::{referenced_icd_categories, Column};
use crate::domain::{CaseRecord, CategoryTag, CategoryVariableDefinition, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Row-inclusion predicate over a category's variable codes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InclusionPredicate {
    codes: BTreeSet<String>,
}

impl InclusionPredicate {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// True if any of the case's variable codes is in the set
    pub fn matches(&self, case: &CaseRecord) -> bool {
        // Iterate the smaller side.
        if case.variables.len() <= self.codes.len() {
            case.variables.keys().any(|k| self.codes.contains(k))
        } else {
            self.codes.iter().any(|c| case.variables.contains_key(c))
        }
    }

    /// Codes in sorted order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Variable definitions of one category plus its inclusion predicate
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    pub category: CategoryTag,
    pub predicate: InclusionPredicate,
    definitions: BTreeMap<String, CategoryVariableDefinition>,
}

impl CategoryFilter {
    pub fn from_definitions(
        category: CategoryTag,
        definitions: impl IntoIterator<Item = CategoryVariableDefinition>,
    ) -> Self {
        let definitions: BTreeMap<String, CategoryVariableDefinition> = definitions
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect();
        let predicate = InclusionPredicate::new(definitions.keys().cloned());
        Self {
            category,
            predicate,
            definitions,
        }
    }

    /// True when no definition matched the category; the job short-circuits
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions ordered by variable code
    pub fn definitions(&self) -> impl Iterator<Item = &CategoryVariableDefinition> {
        self.definitions.values()
    }
}

/// Fetches the definitions of `category` and builds its filter
pub async fn resolve_category(
    catalog: &dyn VariableCatalog,
    category: &CategoryTag,
) -> Result<CategoryFilter> {
    let definitions = catalog.variables_for_category(category).await?;
    tracing::debug!(
        category = %category,
        definitions = definitions.len(),
        "Resolved category variables"
    );
    Ok(CategoryFilter::from_definitions(
        category.clone(),
        definitions,
    ))
}

/// Raw condition code to display name, first definition wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcdIndex {
    names: HashMap<String, String>,
}

impl IcdIndex {
    /// Builds the index scanning definitions in the given order
    pub fn from_definitions<'a>(
        definitions: impl IntoIterator<Item = &'a CategoryVariableDefinition>,
    ) -> Self {
        let mut names = HashMap::new();
        for def in definitions {
            for code in def.condition_codes() {
                names
                    .entry(code.to_string())
                    .or_insert_with(|| def.name.clone());
            }
        }
        Self { names }
    }

    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.names.get(code.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Builds one [`IcdIndex`] per category referenced by `icd_name` columns
///
/// The job's own category reuses the already fetched filter; other tags are
/// fetched from the catalog once each.
pub async fn build_icd_indexes(
    catalog: &dyn VariableCatalog,
    filter: &CategoryFilter,
    columns: &[Column],
) -> Result<HashMap<CategoryTag, IcdIndex>> {
    let mut indexes = HashMap::new();
    for tag in referenced_icd_categories(columns) {
        let index = if *tag == filter.category {
            IcdIndex::from_definitions(filter.definitions())
        } else {
            let other = resolve_category(catalog, tag).await?;
            IcdIndex::from_definitions(other.definitions())
        };
        tracing::debug!(category = %tag, codes = index.len(), "Built icd name index");
        indexes.insert(tag.clone(), index);
    }
    Ok(indexes)
}
