//! PostgreSQL statements and row models
//!
//! SQL text for the keyset cursor and the catalog tables, and the decoding of
//! result rows into domain types.

use crate::core::cursor::JoinQuery;
use crate::core::links::LinkSelection;
use crate::domain::case::deserialize_links;
use crate::domain::{
    ArtifactStatus, CaseRecord, CatexError, CategoryVariableDefinition, ExportArtifact,
    FormSubmission, JobId, Result, RowGroup, StoreError,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;

/// Number of fixed parameters before the per-link name parameters
const FIXED_PARAMS: usize = 3;

pub const VARIABLES_FOR_CATEGORY_SQL: &str =
    "SELECT id, name, condition, category FROM aggregation_variables WHERE category ? $1";

pub const LOCATIONS_SQL: &str = "SELECT id::bigint AS id, name FROM locations";

pub const INSERT_ARTIFACT_SQL: &str = r#"
    INSERT INTO download_data_files (
        uuid, type, generation_time, content, status, success, error_message
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT (uuid) DO NOTHING
"#;

pub const SELECT_ARTIFACT_SQL: &str = r#"
    SELECT uuid, type, generation_time, content, status, success, error_message
    FROM download_data_files
    WHERE uuid = $1
"#;

/// Builds the keyset cursor statement for `query`
///
/// Parameters: `$1` inclusion codes (`text[]`), `$2` last seen case id or
/// NULL, `$3` batch limit, then one link name per join in slot order.
pub fn cursor_sql(query: &JoinQuery) -> String {
    let mut sql = String::from(
        "SELECT d.id::bigint AS id, d.uuid, \
         d.country::bigint AS country, d.region::bigint AS region, \
         d.district::bigint AS district, d.clinic::bigint AS clinic, \
         d.clinic_type, d.geolocation, d.date, d.variables, d.links, \
         f.data AS form_data",
    );
    for (index, _) in query.joins.iter().enumerate() {
        let _ = write!(
            sql,
            ", l{index}.uuid AS link{index}_uuid, l{index}.data AS link{index}_data"
        );
    }

    let _ = write!(
        sql,
        " FROM data d JOIN \"{}\" f ON f.uuid = d.uuid",
        query.form.as_str()
    );

    let position = match query.link_selection {
        LinkSelection::First => "0",
        LinkSelection::Last | LinkSelection::Strict => "-1",
    };
    for (index, join) in query.joins.iter().enumerate() {
        let param = FIXED_PARAMS + index + 1;
        let _ = write!(
            sql,
            " LEFT OUTER JOIN \"{table}\" l{index} ON l{index}.uuid = \
             CASE jsonb_typeof(d.links -> ${param}::text) \
             WHEN 'array' THEN d.links -> ${param}::text ->> {position} \
             ELSE d.links ->> ${param}::text END",
            table = join.target_form.as_str(),
        );
    }

    sql.push_str(
        " WHERE d.variables ?| $1::text[] \
         AND ($2::bigint IS NULL OR d.id > $2::bigint) \
         ORDER BY d.id LIMIT $3",
    );
    sql
}

/// Decodes one cursor row; `joins` is the number of link slots selected
pub fn row_group_from_row(row: &Row, joins: usize) -> Result<RowGroup> {
    let id: i64 = column(row, "id")?;
    let uuid: String = column(row, "uuid")?;
    let variables: Option<Value> = column(row, "variables")?;
    let links: Option<Value> = column(row, "links")?;

    let case = CaseRecord {
        id,
        uuid: uuid.clone(),
        country: column(row, "country")?,
        region: column(row, "region")?,
        district: column(row, "district")?,
        clinic: column(row, "clinic")?,
        clinic_type: column(row, "clinic_type")?,
        geolocation: column(row, "geolocation")?,
        date: column::<Option<NaiveDateTime>>(row, "date")?,
        variables: decode_variables(variables.unwrap_or(Value::Null))?,
        links: decode_links(links.unwrap_or(Value::Null))?,
    };

    let form_data: Option<Value> = column(row, "form_data")?;
    let form = FormSubmission::new(uuid, form_data.unwrap_or(Value::Null));

    let mut linked = Vec::with_capacity(joins);
    for index in 0..joins {
        let link_uuid: Option<String> = column(row, &format!("link{index}_uuid"))?;
        let link_data: Option<Value> = column(row, &format!("link{index}_data"))?;
        linked.push(link_uuid.map(|uuid| FormSubmission::new(uuid, link_data.unwrap_or(Value::Null))));
    }

    Ok(RowGroup { case, form, linked })
}

/// Decodes an `aggregation_variables` row
pub fn variable_from_row(row: &Row) -> Result<CategoryVariableDefinition> {
    let category: Option<Value> = column(row, "category")?;
    let condition: Option<String> = column(row, "condition")?;

    let mut definition = CategoryVariableDefinition::new(
        column::<String>(row, "id")?,
        column::<String>(row, "name")?,
        condition.unwrap_or_default(),
    );
    definition.categories = category_tags(category.unwrap_or(Value::Null));
    Ok(definition)
}

/// Decodes a `download_data_files` row
pub fn artifact_from_row(row: &Row) -> Result<ExportArtifact> {
    let uuid: String = column(row, "uuid")?;
    let status: i32 = column(row, "status")?;
    let success: i32 = column(row, "success")?;

    let status = u8::try_from(status)
        .map_err(|_| malformed(format!("invalid artifact status {status}")))
        .and_then(|s| ArtifactStatus::try_from(s).map_err(malformed))?;

    Ok(ExportArtifact {
        job_id: JobId::new(uuid).map_err(malformed)?,
        content: column::<Option<String>>(row, "content")?.unwrap_or_default(),
        artifact_type: column(row, "type")?,
        status,
        success: success == 1,
        generated_at: column::<DateTime<Utc>>(row, "generation_time")?,
        error: column(row, "error_message")?,
    })
}

/// Category tags are stored either as an array of tags or as an object keyed by tag
fn category_tags(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::Object(map) => map.into_iter().map(|(tag, _)| tag).collect(),
        Value::String(tag) => vec![tag],
        _ => Vec::new(),
    }
}

fn decode_variables(value: Value) -> Result<BTreeMap<String, Value>> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(malformed(format!("variables must be an object, got {other}"))),
    }
}

fn decode_links(value: Value) -> Result<BTreeMap<String, Vec<String>>> {
    deserialize_links(value).map_err(|e| malformed(format!("links: {e}")))
}

fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| malformed(format!("column '{name}': {e}")))
}

fn malformed(message: impl Into<String>) -> CatexError {
    StoreError::MalformedRow(message.into()).into()
}
