//! Error type for `olap-store-parquet`.

use std::path::PathBuf;

use olap_core::TableName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] olap_core::Error),

  #[error("arrow error: {0}")]
  Arrow(#[from] arrow::error::ArrowError),

  #[error("parquet error: {0}")]
  Parquet(#[from] parquet::errors::ParquetError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("blocking task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error("table {0} cannot be stored year/quarter partitioned")]
  UnsupportedPartitioning(TableName),

  #[error("column {column:?} is stored as {found}, expected {expected}")]
  Decode {
    column:   String,
    expected: &'static str,
    found:    String,
  },

  /// Files of one table disagree on their schema.
  #[error("schema of {path:?} differs from the table's other files")]
  SchemaMismatch { path: PathBuf },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
