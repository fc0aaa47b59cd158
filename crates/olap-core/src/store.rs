//! The `TableStore` trait and supporting read types.
//!
//! Implemented by the storage backends (`olap-store-sqlite`, `olap-store-csv`,
//! `olap-store-parquet`). The CLI writes a generated dataset through this
//! abstraction and reads it back for validation without knowing the format.

use std::future::Future;

use serde::Serialize;

use crate::{
  partition::{PartitionFilter, PartitionKey},
  table::{Partitioning, TableName},
  value::RowSet,
};

// ─── Read parameters ─────────────────────────────────────────────────────────

/// Parameters for [`TableStore::read`].
#[derive(Debug, Clone, Default)]
pub struct ReadFilter {
  /// Partition equality filter. Must be empty for unpartitioned tables.
  pub partition: PartitionFilter,
  /// Columns to return, in order. Empty means every stored column, followed
  /// by the partition columns for partitioned tables.
  pub columns:   Vec<String>,
}

impl ReadFilter {
  pub fn all() -> Self { Self::default() }

  pub fn partition(partition: PartitionFilter) -> Self {
    Self { partition, columns: Vec::new() }
  }

  pub fn with_columns<I, S>(mut self, columns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.columns = columns.into_iter().map(Into::into).collect();
    self
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
  pub table:        TableName,
  pub row_count:    u64,
  pub column_count: usize,
  /// On-disk size, when the backend can attribute bytes to a table.
  pub size_bytes:   Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionInfo {
  pub key:        PartitionKey,
  pub row_count:  u64,
  pub size_bytes: Option<u64>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a storage backend for the star schema.
///
/// A write replaces any previous content of the table. All methods return
/// `Send` futures so stores can be shared across tokio tasks.
pub trait TableStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `rows` as the whole content of `table`.
  ///
  /// With [`Partitioning::YearQuarter`] the rows must carry the `year` and
  /// `quarter` columns.
  fn write(
    &self,
    table: TableName,
    rows: RowSet,
    partitioning: Partitioning,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Read rows back. Partitioned tables carry `year` and `quarter`.
  fn read<'a>(
    &'a self,
    table: TableName,
    filter: &'a ReadFilter,
  ) -> impl Future<Output = Result<RowSet, Self::Error>> + Send + 'a;

  fn metadata(
    &self,
    table: TableName,
  ) -> impl Future<Output = Result<TableMetadata, Self::Error>> + Send + '_;

  /// Partitions of `table`, sorted by key. Empty for unpartitioned tables.
  fn partitions(
    &self,
    table: TableName,
  ) -> impl Future<Output = Result<Vec<PartitionInfo>, Self::Error>> + Send + '_;
}
