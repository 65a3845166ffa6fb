//! Encoding and decoding helpers between store types and the plain-text
//! representations kept in SQLite columns, plus the SQL fragments that
//! express [`Filter`]s and field merges over `data_json`.
//!
//! UUIDs are stored as hyphenated lowercase strings; documents as compact
//! JSON.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use settree_core::store::{Document, Filter, Record};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Documents ───────────────────────────────────────────────────────────────

pub fn encode_document(doc: &Document) -> Result<String> {
  Ok(serde_json::to_string(doc)?)
}

/// Raw strings read directly from a `documents` row.
pub struct RawRecord {
  pub doc_id:    String,
  pub data_json: String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { doc_id: row.get(0)?, data_json: row.get(1)? })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      id:   decode_uuid(&self.doc_id)?,
      data: serde_json::from_str(&self.data_json)?,
    })
  }
}

// ─── Field paths ─────────────────────────────────────────────────────────────

/// The JSON path for a top-level field, e.g. `$.parentId`.
fn json_path(field: &str) -> Result<String> {
  let valid = !field.is_empty()
    && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
  if !valid {
    return Err(Error::InvalidField(field.to_owned()));
  }
  Ok(format!("$.{field}"))
}

/// Bind a JSON scalar the way `json_extract` reports it: booleans as
/// integers, numbers as integer or real, strings as text. Arrays and
/// objects have no scalar form.
fn scalar(value: &Value) -> Option<SqlValue> {
  match value {
    Value::Null => Some(SqlValue::Null),
    Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
    Value::Number(n) => n
      .as_i64()
      .map(SqlValue::Integer)
      .or_else(|| n.as_f64().map(SqlValue::Real)),
    Value::String(s) => Some(SqlValue::Text(s.clone())),
    Value::Array(_) | Value::Object(_) => None,
  }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// A `WHERE` fragment (each condition prefixed with ` AND `) and the values
/// it binds, numbered from `?{first_param}`.
pub struct FilterSql {
  pub conditions: String,
  pub params:     Vec<SqlValue>,
}

pub fn encode_filters(filters: &[Filter], first_param: usize) -> Result<FilterSql> {
  let mut conditions = String::new();
  let mut params = Vec::new();

  for filter in filters {
    let path = json_path(filter.field())?;
    let n = first_param + params.len();
    match filter {
      Filter::Eq { value: Value::Null, .. } => {
        conditions.push_str(&format!(" AND json_extract(data_json, '{path}') IS NULL"));
      }
      Filter::Eq { value, .. } => match scalar(value) {
        Some(v) => {
          conditions.push_str(&format!(" AND json_extract(data_json, '{path}') = ?{n}"));
          params.push(v);
        }
        None => {
          conditions
            .push_str(&format!(" AND json_extract(data_json, '{path}') = json(?{n})"));
          params.push(SqlValue::Text(value.to_string()));
        }
      },
      Filter::Contains { value, .. } => {
        let rhs = match scalar(value) {
          Some(v) => {
            params.push(v);
            format!("?{n}")
          }
          None => {
            params.push(SqlValue::Text(value.to_string()));
            format!("json(?{n})")
          }
        };
        conditions.push_str(&format!(
          " AND EXISTS (SELECT 1 FROM json_each(documents.data_json, '{path}') \
           WHERE json_each.value = {rhs})"
        ));
      }
    }
  }

  Ok(FilterSql { conditions, params })
}

// ─── Merges ──────────────────────────────────────────────────────────────────

/// An `UPDATE` that merges `data` into one document's top-level fields.
/// Binds `?1` = collection and `?2` = doc id, then the merged values.
pub struct MergeSql {
  pub sql:    String,
  pub params: Vec<String>,
}

pub fn encode_merge(data: &Document) -> Result<MergeSql> {
  let mut params = Vec::with_capacity(data.len());
  let mut pairs = Vec::with_capacity(data.len());

  for (field, value) in data {
    let path = json_path(field)?;
    pairs.push(format!("'{path}', json(?{})", 3 + params.len()));
    params.push(value.to_string());
  }

  let set = if pairs.is_empty() {
    "data_json".to_owned()
  } else {
    format!("json_set(data_json, {})", pairs.join(", "))
  };

  Ok(MergeSql {
    sql: format!(
      "UPDATE documents SET data_json = {set} WHERE collection = ?1 AND doc_id = ?2"
    ),
    params,
  })
}
