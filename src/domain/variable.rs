//! Category variable definitions

use serde::{Deserialize, Serialize};

/// Metadata for one variable code within one or more categories
///
/// `condition` lists the raw codes (ICD-style) the variable represents,
/// comma-separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVariableDefinition {
    /// The variable code, e.g. `cmd_1`
    pub id: String,

    /// Display label
    pub name: String,

    #[serde(default)]
    pub condition: String,

    /// Category tags this variable belongs to
    #[serde(default, alias = "category")]
    pub categories: Vec<String>,
}

impl CategoryVariableDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            condition: condition.into(),
            categories: Vec::new(),
        }
    }

    /// Adds a category tag (builder style)
    pub fn in_category(mut self, tag: impl Into<String>) -> Self {
        self.categories.push(tag.into());
        self
    }

    pub fn belongs_to(&self, tag: &str) -> bool {
        self.categories.iter().any(|c| c == tag)
    }

    /// The raw codes listed in `condition`, trimmed, empty entries dropped
    pub fn condition_codes(&self) -> impl Iterator<Item = &str> {
        self.condition
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_codes_split_and_trim() {
        let def = CategoryVariableDefinition::new("cmd_1", "Cholera", "A00, A00.1 ,A00.9,");
        let codes: Vec<&str> = def.condition_codes().collect();
        assert_eq!(codes, vec!["A00", "A00.1", "A00.9"]);
    }

    #[test]
    fn test_single_condition() {
        let def = CategoryVariableDefinition::new("cmd_2", "Typhoid", "A01");
        assert_eq!(def.condition_codes().collect::<Vec<_>>(), vec!["A01"]);
    }

    #[test]
    fn test_category_membership() {
        let def = CategoryVariableDefinition::new("cmd_1", "Cholera", "A00")
            .in_category("cd_tab")
            .in_category("alert");
        assert!(def.belongs_to("cd_tab"));
        assert!(!def.belongs_to("ncd_tab"));
    }
}
