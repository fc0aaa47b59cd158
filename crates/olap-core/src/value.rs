//! The dynamic row model shared by every storage and query backend.
//!
//! Typed rows ([`crate::dimension`], [`crate::fact`]) convert to and from
//! [`RowSet`]s through the [`Record`] trait. Backends only ever see
//! `RowSet`s, so adding a table never touches a backend.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{Error, Result, table::TableName};

/// Date format used for every textual date encoding.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Timestamp format used for every textual timestamp encoding.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Column types ────────────────────────────────────────────────────────────

/// The logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  Int,
  Float,
  Text,
  Bool,
  Date,
  Timestamp,
}

impl ColumnType {
  pub fn name(self) -> &'static str {
    match self {
      Self::Int => "int",
      Self::Float => "float",
      Self::Text => "text",
      Self::Bool => "bool",
      Self::Date => "date",
      Self::Timestamp => "timestamp",
    }
  }

  /// Parse the textual encoding produced by [`Value::to_text`].
  ///
  /// The empty string decodes to [`Value::Null`] for every type except
  /// `Text`.
  pub fn parse(self, column: &str, raw: &str) -> Result<Value> {
    let invalid = || Error::InvalidValue {
      column: column.to_owned(),
      value:  raw.to_owned(),
    };

    if raw.is_empty() && self != Self::Text {
      return Ok(Value::Null);
    }

    Ok(match self {
      Self::Int => Value::Int(raw.parse().map_err(|_| invalid())?),
      Self::Float => Value::Float(raw.parse().map_err(|_| invalid())?),
      Self::Text => Value::Text(raw.to_owned()),
      Self::Bool => match raw {
        "true" | "True" | "1" => Value::Bool(true),
        "false" | "False" | "0" => Value::Bool(false),
        _ => return Err(invalid()),
      },
      Self::Date => Value::Date(
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())?,
      ),
      Self::Timestamp => Value::Timestamp(
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
          .map_err(|_| invalid())?,
      ),
    })
  }
}

/// A named, typed column of a table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
  pub name: &'static str,
  pub ty:   ColumnType,
}

impl Column {
  pub const fn new(name: &'static str, ty: ColumnType) -> Self {
    Self { name, ty }
  }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Int(i64),
  Float(f64),
  Text(String),
  Bool(bool),
  Date(NaiveDate),
  Timestamp(NaiveDateTime),
}

impl Value {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::Int(_) => "int",
      Self::Float(_) => "float",
      Self::Text(_) => "text",
      Self::Bool(_) => "bool",
      Self::Date(_) => "date",
      Self::Timestamp(_) => "timestamp",
    }
  }

  /// Canonical textual encoding, the inverse of [`ColumnType::parse`].
  pub fn to_text(&self) -> String {
    match self {
      Self::Null => String::new(),
      Self::Int(v) => v.to_string(),
      Self::Float(v) => v.to_string(),
      Self::Text(v) => v.clone(),
      Self::Bool(v) => v.to_string(),
      Self::Date(v) => v.format(DATE_FORMAT).to_string(),
      Self::Timestamp(v) => v.format(TIMESTAMP_FORMAT).to_string(),
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Self::Int(v) => Some(*v),
      _ => None,
    }
  }

  /// Floats accept integer cells too; SQL engines drop the fraction of
  /// whole-number reals.
  pub fn as_float(&self) -> Option<f64> {
    match self {
      Self::Float(v) => Some(*v),
      Self::Int(v) => Some(*v as f64),
      _ => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(v) => Some(v),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(v) => Some(*v),
      Self::Int(0) => Some(false),
      Self::Int(1) => Some(true),
      _ => None,
    }
  }

  pub fn as_date(&self) -> Option<NaiveDate> {
    match self {
      Self::Date(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
    match self {
      Self::Timestamp(v) => Some(*v),
      _ => None,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Null => f.write_str("NULL"),
      other => f.write_str(&other.to_text()),
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Self::Int(i64::from(v)) }
}

impl From<u32> for Value {
  fn from(v: u32) -> Self { Self::Int(i64::from(v)) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Self::Float(v) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<NaiveDate> for Value {
  fn from(v: NaiveDate) -> Self { Self::Date(v) }
}

impl From<NaiveDateTime> for Value {
  fn from(v: NaiveDateTime) -> Self { Self::Timestamp(v) }
}

// ─── Row sets ────────────────────────────────────────────────────────────────

/// A materialised table: column names plus rows of cells in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<Value>>,
}

impl RowSet {
  pub fn new(columns: Vec<String>) -> Self {
    Self { columns, rows: Vec::new() }
  }

  /// Build a row set from typed records, in the table's schema order.
  pub fn from_records<R: Record>(records: &[R]) -> Self {
    Self {
      columns: R::TABLE.column_names(),
      rows:    records.iter().map(Record::to_row).collect(),
    }
  }

  /// Decode every row into `R`, looking columns up by name.
  pub fn to_records<R: Record>(&self) -> Result<Vec<R>> {
    self.views().map(|view| R::from_row(&view)).collect()
  }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  /// Append a row after checking its width.
  pub fn push(&mut self, row: Vec<Value>) -> Result<()> {
    if row.len() != self.columns.len() {
      return Err(Error::RowWidth {
        expected: self.columns.len(),
        found:    row.len(),
      });
    }
    self.rows.push(row);
    Ok(())
  }

  pub fn views(&self) -> impl Iterator<Item = RowView<'_>> {
    self
      .rows
      .iter()
      .map(|values| RowView { columns: &self.columns, values })
  }

  /// Keep only `names`, in the order given.
  pub fn project(self, names: &[String]) -> Result<Self> {
    let indices = names
      .iter()
      .map(|n| {
        self
          .column_index(n)
          .ok_or_else(|| Error::MissingColumn(n.clone()))
      })
      .collect::<Result<Vec<_>>>()?;

    let rows = self
      .rows
      .into_iter()
      .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
      .collect();

    Ok(Self { columns: names.to_vec(), rows })
  }

  /// All values of one column.
  pub fn column_values(&self, name: &str) -> Result<impl Iterator<Item = &Value>> {
    let idx = self
      .column_index(name)
      .ok_or_else(|| Error::MissingColumn(name.to_owned()))?;
    Ok(self.rows.iter().map(move |row| &row[idx]))
  }
}

/// A borrowed view of one row with by-name typed accessors.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
  columns: &'a [String],
  values:  &'a [Value],
}

impl<'a> RowView<'a> {
  pub fn new(columns: &'a [String], values: &'a [Value]) -> Self {
    Self { columns, values }
  }

  pub fn get(&self, name: &str) -> Result<&'a Value> {
    self
      .columns
      .iter()
      .position(|c| c == name)
      .and_then(|i| self.values.get(i))
      .ok_or_else(|| Error::MissingColumn(name.to_owned()))
  }

  fn typed<T>(
    &self,
    name: &str,
    expected: &'static str,
    f: impl FnOnce(&'a Value) -> Option<T>,
  ) -> Result<T> {
    let value = self.get(name)?;
    f(value).ok_or_else(|| Error::TypeMismatch {
      column: name.to_owned(),
      expected,
      found: value.kind(),
    })
  }

  pub fn int(&self, name: &str) -> Result<i64> {
    self.typed(name, "int", Value::as_int)
  }

  /// An integer column narrowed to `i32`.
  pub fn int32(&self, name: &str) -> Result<i32> {
    let v = self.int(name)?;
    i32::try_from(v).map_err(|_| Error::InvalidValue {
      column: name.to_owned(),
      value:  v.to_string(),
    })
  }

  pub fn float(&self, name: &str) -> Result<f64> {
    self.typed(name, "float", Value::as_float)
  }

  pub fn text(&self, name: &str) -> Result<String> {
    self.typed(name, "text", |v| v.as_text().map(str::to_owned))
  }

  pub fn bool(&self, name: &str) -> Result<bool> {
    self.typed(name, "bool", Value::as_bool)
  }

  pub fn date(&self, name: &str) -> Result<NaiveDate> {
    self.typed(name, "date", Value::as_date)
  }

  pub fn timestamp(&self, name: &str) -> Result<NaiveDateTime> {
    self.typed(name, "timestamp", Value::as_timestamp)
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A typed row belonging to one table of the star schema.
pub trait Record: Sized {
  const TABLE: TableName;

  /// Cells in the order of `TABLE.schema()`.
  fn to_row(&self) -> Vec<Value>;

  /// Decode from a row, looking columns up by name so extra columns (such as
  /// re-attached partition columns) are ignored.
  fn from_row(row: &RowView<'_>) -> Result<Self>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_encoding_parses_back() {
    let date = NaiveDate::from_ymd_opt(2023, 2, 15).unwrap();
    let ts = date.and_hms_opt(9, 30, 5).unwrap();
    let cases = [
      (ColumnType::Int, Value::Int(-42)),
      (ColumnType::Float, Value::Float(19.99)),
      (ColumnType::Text, Value::Text("Q1".into())),
      (ColumnType::Bool, Value::Bool(true)),
      (ColumnType::Date, Value::Date(date)),
      (ColumnType::Timestamp, Value::Timestamp(ts)),
    ];
    for (ty, value) in cases {
      assert_eq!(ty.parse("c", &value.to_text()).unwrap(), value);
    }
  }

  #[test]
  fn empty_text_is_null_except_for_text_columns() {
    assert_eq!(ColumnType::Int.parse("c", "").unwrap(), Value::Null);
    assert_eq!(
      ColumnType::Text.parse("c", "").unwrap(),
      Value::Text(String::new())
    );
  }

  #[test]
  fn bad_integer_is_reported_with_column() {
    let err = ColumnType::Int.parse("quantity", "many").unwrap_err();
    assert!(matches!(err, Error::InvalidValue { column, .. } if column == "quantity"));
  }

  #[test]
  fn project_reorders_and_rejects_unknown_columns() {
    let mut rows = RowSet::new(vec!["a".into(), "b".into()]);
    rows.push(vec![Value::Int(1), Value::Int(2)]).unwrap();

    let projected = rows.clone().project(&["b".into(), "a".into()]).unwrap();
    assert_eq!(projected.rows[0], vec![Value::Int(2), Value::Int(1)]);

    assert!(rows.project(&["c".into()]).is_err());
  }

  #[test]
  fn push_rejects_wrong_width() {
    let mut rows = RowSet::new(vec!["a".into()]);
    assert!(matches!(
      rows.push(vec![Value::Int(1), Value::Int(2)]),
      Err(Error::RowWidth { expected: 1, found: 2 })
    ));
  }

  #[test]
  fn view_accessors_check_types() {
    let columns = vec!["n".to_string(), "flag".to_string()];
    let values = vec![Value::Int(3), Value::Int(1)];
    let view = RowView::new(&columns, &values);
    assert_eq!(view.int("n").unwrap(), 3);
    assert!(view.bool("flag").unwrap());
    assert_eq!(view.float("n").unwrap(), 3.0);
    assert!(matches!(view.text("n"), Err(Error::TypeMismatch { .. })));
    assert!(matches!(view.int("missing"), Err(Error::MissingColumn(_))));
  }
}
