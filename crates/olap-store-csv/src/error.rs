//! Error type for `olap-store-csv`.

use std::path::PathBuf;

use olap_core::TableName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] olap_core::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("blocking task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error("table {0} cannot be stored year/quarter partitioned")]
  UnsupportedPartitioning(TableName),

  /// Files of one table disagree on their header.
  #[error("header of {path:?} differs from the table's other files")]
  HeaderMismatch { path: PathBuf },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
