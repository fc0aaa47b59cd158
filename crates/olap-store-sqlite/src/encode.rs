//! Conversions between [`olap_core::Value`] cells and SQLite values.
//!
//! Dates and timestamps are stored in the textual formats of
//! [`olap_core::value`], booleans as 0/1. Decoding is driven by the logical
//! column type when one is known; free-form query results are decoded by
//! SQLite storage class alone.

use olap_core::{Value, value::ColumnType};
use rusqlite::types::Value as SqlValue;

use crate::{Error, Result};

pub fn encode_value(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Int(v) => SqlValue::Integer(*v),
    Value::Float(v) => SqlValue::Real(*v),
    Value::Text(v) => SqlValue::Text(v.clone()),
    Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
    Value::Date(_) | Value::Timestamp(_) => SqlValue::Text(value.to_text()),
  }
}

fn storage_class(value: &SqlValue) -> &'static str {
  match value {
    SqlValue::Null => "NULL",
    SqlValue::Integer(_) => "INTEGER",
    SqlValue::Real(_) => "REAL",
    SqlValue::Text(_) => "TEXT",
    SqlValue::Blob(_) => "BLOB",
  }
}

/// Decode a stored cell of a known column type.
pub fn decode_typed(column: &str, ty: ColumnType, raw: SqlValue) -> Result<Value> {
  let mismatch = |raw: &SqlValue| Error::Decode {
    column:   column.to_owned(),
    expected: ty.name(),
    found:    storage_class(raw),
  };

  Ok(match (ty, raw) {
    (_, SqlValue::Null) => Value::Null,
    (ColumnType::Int, SqlValue::Integer(v)) => Value::Int(v),
    (ColumnType::Float, SqlValue::Real(v)) => Value::Float(v),
    (ColumnType::Float, SqlValue::Integer(v)) => Value::Float(v as f64),
    (ColumnType::Text, SqlValue::Text(v)) => Value::Text(v),
    (ColumnType::Bool, SqlValue::Integer(v @ (0 | 1))) => Value::Bool(v == 1),
    (ColumnType::Date | ColumnType::Timestamp, SqlValue::Text(v)) => {
      ty.parse(column, &v)?
    }
    (_, other) => return Err(mismatch(&other)),
  })
}

/// Decode a free-form query cell by storage class.
pub fn decode_untyped(raw: SqlValue) -> Value {
  match raw {
    SqlValue::Null => Value::Null,
    SqlValue::Integer(v) => Value::Int(v),
    SqlValue::Real(v) => Value::Float(v),
    SqlValue::Text(v) => Value::Text(v),
    SqlValue::Blob(v) => Value::Text(String::from_utf8_lossy(&v).into_owned()),
  }
}
