//! Error types for `olap-core`.

use thiserror::Error;

use crate::table::TableName;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid parameter: {0}")]
  InvalidParameter(String),

  #[error("unknown column {column:?} for table {table}")]
  UnknownColumn { table: TableName, column: String },

  #[error("missing column {0:?}")]
  MissingColumn(String),

  #[error("column {column:?} holds {found}, expected {expected}")]
  TypeMismatch {
    column:   String,
    expected: &'static str,
    found:    &'static str,
  },

  #[error("row has {found} values but {expected} columns")]
  RowWidth { expected: usize, found: usize },

  #[error("table {table} is missing partition columns {missing:?}")]
  MissingPartitionColumns {
    table:   TableName,
    missing: Vec<String>,
  },

  #[error("table {0} is not partitioned")]
  NotPartitioned(TableName),

  #[error("invalid quarter: {0:?}")]
  InvalidQuarter(String),

  #[error("invalid partition path: {0:?}")]
  InvalidPartitionPath(String),

  #[error("invalid {column} value: {value:?}")]
  InvalidValue { column: String, value: String },

  #[error("SCD type 2 violation ({reason}) for product ids {product_ids:?}")]
  ScdViolation {
    reason:      &'static str,
    product_ids: Vec<String>,
  },

  #[error("measure mismatch ({reason}) in {count} fact rows, first at transaction {first:?}")]
  MeasureMismatch {
    reason: &'static str,
    count:  usize,
    first:  (i64, i32),
  },

  #[error("time dimension violation ({reason}) in {count} rows")]
  TimeDimension { reason: &'static str, count: usize },

  #[error("duplicate keys in {table}: {keys:?}")]
  DuplicateKeys { table: TableName, keys: Vec<i64> },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
