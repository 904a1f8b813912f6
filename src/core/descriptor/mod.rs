//! Field descriptors
//!
//! Each requested output column is described by a small string expression.
//! Expressions are parsed once per job into [`FieldDescriptor`] values so the
//! per-row projection never re-splits strings.
//!
//! # Example
//!
//! ```rust
//! use catex::core::descriptor::{parse_columns, FieldDescriptor};
//! use catex::domain::DescriptorSpec;
//!
//! let specs = vec![
//!     DescriptorSpec::new("code$gen_1,gen_2$Male,Female$Unknown", "Gender"),
//!     DescriptorSpec::new("gen_link$alert_investigation$return_lab", "Lab"),
//! ];
//! let columns = parse_columns(&specs).unwrap();
//! assert!(matches!(columns[1].descriptor, FieldDescriptor::GenLink { .. }));
//! ```

pub mod parser;
pub mod translate;

pub use parser::{parse_column, parse_columns, parse_descriptor};
pub use translate::{render_value, Translation};

use crate::domain::CategoryTag;

/// Location level resolved through the location lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationLevel {
    Region,
    District,
    Clinic,
}

/// Date component extracted by a date-part descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Year,
    Month,
    EpiWeek,
}

/// A parsed directive computing one output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDescriptor {
    /// Field of the primary form submission
    Field(String),

    /// Name of the case's region, district or clinic
    Location(LocationLevel),

    /// Constant text
    Literal(String),

    /// Labels of the listed codes present on the case, space-joined
    Code {
        codes: Vec<String>,
        labels: Vec<String>,
        default: Option<String>,
    },

    /// Count stored under a variable code
    CodeValue(String),

    /// Field of the submission reached through a named link
    GenLink { link: String, field: String },

    /// Display name of the primary submission's `icd_code`
    IcdName { category: CategoryTag },

    /// Year, month or epi week of a primary form date field
    DatePart { field: String, part: DatePart },
}

/// One output column: key, descriptor and optional translation
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub output_key: String,
    pub descriptor: FieldDescriptor,
    pub translate: Option<Translation>,
}

/// Distinct link names referenced by `columns`, in first-appearance order
pub fn referenced_links(columns: &[Column]) -> Vec<&str> {
    let mut links: Vec<&str> = Vec::new();
    for column in columns {
        if let FieldDescriptor::GenLink { link, .. } = &column.descriptor {
            if !links.contains(&link.as_str()) {
                links.push(link);
            }
        }
    }
    links
}

/// Distinct categories referenced by `icd_name` columns, in first-appearance order
pub fn referenced_icd_categories(columns: &[Column]) -> Vec<&CategoryTag> {
    let mut tags: Vec<&CategoryTag> = Vec::new();
    for column in columns {
        if let FieldDescriptor::IcdName { category } = &column.descriptor {
            if !tags.contains(&category) {
                tags.push(category);
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DescriptorSpec;

    #[test]
    fn test_referenced_links_dedup_in_order() {
        let columns = parse_columns(&[
            DescriptorSpec::new("gen_link$b$x", "B1"),
            DescriptorSpec::new("gen_link$a$y", "A1"),
            DescriptorSpec::new("gen_link$b$z", "B2"),
            DescriptorSpec::new("age", "Age"),
        ])
        .unwrap();
        assert_eq!(referenced_links(&columns), vec!["b", "a"]);
    }

    #[test]
    fn test_referenced_icd_categories() {
        let columns = parse_columns(&[
            DescriptorSpec::new("icd_name$cd_tab", "Disease"),
            DescriptorSpec::new("icd_name$cd_tab", "Disease again"),
            DescriptorSpec::new("icd_name$ncd_tab", "NCD"),
        ])
        .unwrap();
        let tags: Vec<&str> = referenced_icd_categories(&columns)
            .into_iter()
            .map(CategoryTag::as_str)
            .collect();
        assert_eq!(tags, vec!["cd_tab", "ncd_tab"]);
    }
}
