//! Descriptor grammar
//!
//! ```text
//! <field>                              primary form field
//! region | district | clinic           location name of the case
//! value:<literal>                      constant
//! code$<c1,c2,..>$<t1,t2,..>[$default] code membership labels
//! code_value$<code>                    count stored under a code
//! gen_link$<link>$<field>              field of a linked submission
//! icd_name$<category>                  display name for icd_code
//! <field>$year | $month | $epi_week    date part
//! <any>$translate;<mapping>            post-hoc remap (suffix)
//! ```

use super::translate::{split_translate, Translation};
use super::{Column, DatePart, FieldDescriptor, LocationLevel};
use crate::domain::{CategoryTag, DescriptorError, DescriptorSpec};
use std::collections::HashSet;

const LITERAL_PREFIX: &str = "value:";

/// Parses every descriptor of a job into its column plan, preserving order
///
/// # Errors
///
/// Any malformed descriptor or a duplicated output key fails the whole set.
pub fn parse_columns(specs: &[DescriptorSpec]) -> Result<Vec<Column>, DescriptorError> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(specs.len());

    for spec in specs {
        if spec.output_key.trim().is_empty() {
            return Err(DescriptorError::EmptyOutputKey(spec.source.clone()));
        }
        if !seen.insert(spec.output_key.as_str()) {
            return Err(DescriptorError::DuplicateOutputKey(spec.output_key.clone()));
        }
        columns.push(parse_column(&spec.source, &spec.output_key)?);
    }

    Ok(columns)
}

/// Parses one `(sourceExpression, outputKey)` pair
pub fn parse_column(expression: &str, output_key: &str) -> Result<Column, DescriptorError> {
    let (base, payload) = split_translate(expression);
    let translate = payload
        .map(|p| Translation::parse(expression, p))
        .transpose()?;
    let descriptor = parse_descriptor(base, output_key)?;

    Ok(Column {
        output_key: output_key.to_string(),
        descriptor,
        translate,
    })
}

/// Parses a base expression (translate modifier already removed)
pub fn parse_descriptor(
    expression: &str,
    output_key: &str,
) -> Result<FieldDescriptor, DescriptorError> {
    if expression.is_empty() {
        return Err(DescriptorError::Empty(output_key.to_string()));
    }

    // Literals may contain '$', so they are recognised before splitting.
    if let Some(literal) = expression.strip_prefix(LITERAL_PREFIX) {
        return Ok(FieldDescriptor::Literal(literal.to_string()));
    }

    let parts: Vec<&str> = expression.split('$').collect();
    let arity = |directive: &'static str, expected: &'static str| DescriptorError::WrongArity {
        expression: expression.to_string(),
        directive,
        expected,
    };

    match parts.as_slice() {
        ["code", rest @ ..] => {
            let (codes, labels, default) = match rest {
                [codes, labels] => (*codes, *labels, None),
                [codes, labels, default] => (*codes, *labels, Some(default.to_string())),
                _ => return Err(arity("code", "code$<codes>$<labels>[$default]")),
            };
            let codes: Vec<String> = codes.split(',').map(str::to_string).collect();
            let labels: Vec<String> = labels.split(',').map(str::to_string).collect();
            if codes.len() != labels.len() {
                return Err(DescriptorError::CodeArityMismatch {
                    expression: expression.to_string(),
                    codes: codes.len(),
                    labels: labels.len(),
                });
            }
            Ok(FieldDescriptor::Code {
                codes,
                labels,
                default,
            })
        }
        ["code_value", rest @ ..] => match rest {
            [code] if !code.is_empty() => Ok(FieldDescriptor::CodeValue(code.to_string())),
            _ => Err(arity("code_value", "code_value$<code>")),
        },
        ["gen_link", rest @ ..] => match rest {
            [link, field] if !link.is_empty() && !field.is_empty() => {
                Ok(FieldDescriptor::GenLink {
                    link: link.to_string(),
                    field: field.to_string(),
                })
            }
            _ => Err(arity("gen_link", "gen_link$<link>$<field>")),
        },
        ["icd_name", rest @ ..] => match rest {
            [tag] => CategoryTag::new(*tag)
                .map(|category| FieldDescriptor::IcdName { category })
                .map_err(|_| arity("icd_name", "icd_name$<category>")),
            _ => Err(arity("icd_name", "icd_name$<category>")),
        },
        [field, part] => {
            let part = match *part {
                "year" => DatePart::Year,
                "month" => DatePart::Month,
                "epi_week" => DatePart::EpiWeek,
                _ => return Err(DescriptorError::Unrecognised(expression.to_string())),
            };
            if field.is_empty() {
                return Err(DescriptorError::Unrecognised(expression.to_string()));
            }
            if field.contains(':') {
                return Err(DescriptorError::ReservedColon(expression.to_string()));
            }
            Ok(FieldDescriptor::DatePart {
                field: field.to_string(),
                part,
            })
        }
        [field] => {
            if field.contains(':') {
                return Err(DescriptorError::ReservedColon(expression.to_string()));
            }
            Ok(match *field {
                "region" => FieldDescriptor::Location(LocationLevel::Region),
                "district" => FieldDescriptor::Location(LocationLevel::District),
                "clinic" => FieldDescriptor::Location(LocationLevel::Clinic),
                other => FieldDescriptor::Field(other.to_string()),
            })
        }
        _ => Err(DescriptorError::Unrecognised(expression.to_string())),
    }
}
