//! Error type for `olap-store-sqlite`.

use olap_core::TableName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] olap_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The fixed schema only carries partition columns on the fact table.
  #[error("table {0} cannot be stored year/quarter partitioned")]
  UnsupportedPartitioning(TableName),

  #[error("column {column:?} holds SQLite {found}, expected {expected}")]
  Decode {
    column:   String,
    expected: &'static str,
    found:    &'static str,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
