//! Row projector
//!
//! Evaluates every column of a job against one joined row-group. Projection is
//! total: values that cannot be resolved (missing fields, unknown locations,
//! absent links, unparsable dates) become empty cells, never errors.

use crate::core::calendar::{parse_date_value, EpiWeekCalendar};
use crate::core::category::IcdIndex;
use crate::core::descriptor::{render_value, Column, DatePart, FieldDescriptor, LocationLevel};
use crate::core::links::JoinPlan;
use crate::core::locations::LocationLookup;
use crate::domain::{CaseRecord, CategoryTag, RowGroup};
use chrono::Datelike;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Primary form field holding the raw diagnosis code
const ICD_CODE_FIELD: &str = "icd_code";

/// One projected cell; `None` renders as an empty cell
pub type Cell = Option<Value>;

/// Everything projection needs besides the row itself, fixed for a job
pub struct RowProjector {
    columns: Vec<Column>,
    plan: JoinPlan,
    locations: Arc<dyn LocationLookup>,
    icd_indexes: HashMap<CategoryTag, IcdIndex>,
    calendar: Arc<dyn EpiWeekCalendar>,
}

impl RowProjector {
    pub fn new(
        columns: Vec<Column>,
        plan: JoinPlan,
        locations: Arc<dyn LocationLookup>,
        icd_indexes: HashMap<CategoryTag, IcdIndex>,
        calendar: Arc<dyn EpiWeekCalendar>,
    ) -> Self {
        Self {
            columns,
            plan,
            locations,
            icd_indexes,
            calendar,
        }
    }

    /// Output keys in column order
    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.output_key.as_str()).collect()
    }

    /// Projects one row-group into cells, one per column in column order
    pub fn project(&self, group: &RowGroup) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|column| {
                let value = self.evaluate(&column.descriptor, group);
                match &column.translate {
                    Some(translation) => translation.apply(value),
                    None => value,
                }
            })
            .collect()
    }

    fn evaluate(&self, descriptor: &FieldDescriptor, group: &RowGroup) -> Cell {
        match descriptor {
            FieldDescriptor::Field(name) => group.form.field(name).cloned(),
            FieldDescriptor::Location(level) => location_id(&group.case, *level)
                .and_then(|id| self.locations.location_name(id))
                .map(|name| Value::String(name.to_string())),
            FieldDescriptor::Literal(text) => Some(Value::String(text.clone())),
            FieldDescriptor::Code {
                codes,
                labels,
                default,
            } => {
                let matched: Vec<&str> = codes
                    .iter()
                    .zip(labels)
                    .filter(|(code, _)| group.case.has_variable(code))
                    .map(|(_, label)| label.as_str())
                    .collect();
                if matched.is_empty() {
                    default.clone().map(Value::String)
                } else {
                    Some(Value::String(matched.join(" ")))
                }
            }
            FieldDescriptor::CodeValue(code) => group
                .case
                .variables
                .get(code)
                .filter(|v| !v.is_null())
                .cloned(),
            FieldDescriptor::GenLink { link, field } => self
                .plan
                .slot(link)
                .and_then(|slot| group.linked(slot))
                .and_then(|submission| submission.field(field))
                .cloned(),
            FieldDescriptor::IcdName { category } => {
                let code = render_value(group.form.field(ICD_CODE_FIELD)?);
                self.icd_indexes
                    .get(category)?
                    .lookup(&code)
                    .map(|name| Value::String(name.to_string()))
            }
            FieldDescriptor::DatePart { field, part } => {
                let date = parse_date_value(group.form.field(field)?)?.date();
                match part {
                    DatePart::Year => Some(Value::from(date.year())),
                    DatePart::Month => Some(Value::from(date.month())),
                    DatePart::EpiWeek => self
                        .calendar
                        .epi_week(date)
                        .map(|epi| Value::from(epi.week)),
                }
            }
        }
    }
}

fn location_id(case: &CaseRecord, level: LocationLevel) -> Option<i64> {
    match level {
        LocationLevel::Region => case.region,
        LocationLevel::District => case.district,
        LocationLevel::Clinic => case.clinic,
    }
}
