//! [`CsvStore`]: Hive-partitioned CSV files behind [`TableStore`].

use std::path::{Path, PathBuf};

use olap_core::{
  Partitioning, RowSet, TableName,
  layout::{TableLayout, attach_partition, split_by_partition},
  store::{PartitionInfo, ReadFilter, TableMetadata, TableStore},
};
use tracing::{debug, info};

use crate::{Error, Result, file};

pub const EXTENSION: &str = "csv";

/// CSV files under a root directory, one subdirectory per table.
#[derive(Debug, Clone)]
pub struct CsvStore {
  root:      PathBuf,
  delimiter: u8,
}

impl CsvStore {
  /// A comma-delimited store rooted at `root`. Nothing is created until the
  /// first write.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into(), delimiter: b',' }
  }

  pub fn with_delimiter(mut self, delimiter: u8) -> Self {
    self.delimiter = delimiter;
    self
  }

  pub fn root(&self) -> &Path { &self.root }

  pub fn delimiter(&self) -> u8 { self.delimiter }

  fn layout(&self, table: TableName) -> TableLayout {
    TableLayout::new(&self.root, table, EXTENSION)
  }

  /// Run blocking file work for `table` off the async runtime.
  async fn blocking<T, F>(&self, table: TableName, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(TableLayout, u8) -> Result<T> + Send + 'static,
  {
    let layout = self.layout(table);
    let delimiter = self.delimiter;
    tokio::task::spawn_blocking(move || f(layout, delimiter)).await?
  }
}

/// Default read columns: the schema, plus partition columns when the table
/// is stored partitioned.
fn default_columns(table: TableName, partitioned: bool) -> Vec<String> {
  let mut columns = table.column_names();
  if partitioned {
    columns.extend(
      table
        .partitioning()
        .columns()
        .iter()
        .map(|c| c.name.to_owned()),
    );
  }
  columns
}

// ─── TableStore impl ─────────────────────────────────────────────────────────

impl TableStore for CsvStore {
  type Error = Error;

  async fn write(
    &self,
    table: TableName,
    rows: RowSet,
    partitioning: Partitioning,
  ) -> Result<()> {
    if partitioning == Partitioning::YearQuarter
      && table.partitioning() == Partitioning::None
    {
      return Err(Error::UnsupportedPartitioning(table));
    }
    for column in &rows.columns {
      table.require_column_type(column)?;
    }

    let count = rows.len();
    let files = self
      .blocking(table, move |layout, delimiter| {
        layout.reset()?;
        match partitioning {
          Partitioning::None => {
            file::write_rows(&layout.unpartitioned_file(), delimiter, &rows)?;
            Ok(1)
          }
          Partitioning::YearQuarter => {
            let parts = split_by_partition(table, rows)?;
            for (key, part) in &parts {
              std::fs::create_dir_all(layout.partition_dir(key))?;
              file::write_rows(&layout.partition_file(key), delimiter, part)?;
              debug!(%table, partition = %key, rows = part.len(), "wrote csv partition");
            }
            Ok(parts.len())
          }
        }
      })
      .await?;

    info!(%table, rows = count, files, "wrote csv table");
    Ok(())
  }

  async fn read(&self, table: TableName, filter: &ReadFilter) -> Result<RowSet> {
    for column in &filter.columns {
      table.require_column_type(column)?;
    }
    let partition = filter.partition;
    let columns = filter.columns.clone();

    self
      .blocking(table, move |layout, delimiter| {
        let files = layout.files(&partition)?;

        let mut out: Option<RowSet> = None;
        for data_file in &files {
          let mut rows = file::read_rows(&data_file.path, delimiter, table)?;
          if let Some(key) = &data_file.partition {
            rows = attach_partition(rows, key);
          }
          if let Some(acc) = out.as_mut() {
            if acc.columns != rows.columns {
              return Err(Error::HeaderMismatch { path: data_file.path.clone() });
            }
            acc.rows.extend(rows.rows);
          } else {
            out = Some(rows);
          }
        }

        let rows = out.unwrap_or_else(|| {
          RowSet::new(default_columns(table, table.partitioning() != Partitioning::None))
        });
        if columns.is_empty() {
          Ok(rows)
        } else {
          Ok(rows.project(&columns)?)
        }
      })
      .await
  }

  async fn metadata(&self, table: TableName) -> Result<TableMetadata> {
    self
      .blocking(table, move |layout, delimiter| {
        let files = layout.files(&Default::default())?;
        let mut row_count = 0;
        let mut size_bytes = 0;
        for f in &files {
          row_count += file::count_rows(&f.path, delimiter)?;
          size_bytes += f.size_bytes;
        }

        let column_count = match files.first() {
          Some(f) => {
            let partition_columns = if f.partition.is_some() {
              table.partitioning().columns().len()
            } else {
              0
            };
            file::header(&f.path, delimiter)?.len() + partition_columns
          }
          None => table.schema().len(),
        };

        Ok(TableMetadata {
          table,
          row_count,
          column_count,
          size_bytes: Some(size_bytes),
        })
      })
      .await
  }

  async fn partitions(&self, table: TableName) -> Result<Vec<PartitionInfo>> {
    if table.partitioning() == Partitioning::None {
      return Ok(Vec::new());
    }

    self
      .blocking(table, move |layout, delimiter| {
        layout
          .discover()?
          .into_iter()
          .map(|p| {
            let row_count = p
              .files
              .iter()
              .map(|f| file::count_rows(&f.path, delimiter))
              .sum::<Result<u64>>()?;
            Ok(PartitionInfo {
              key: p.key,
              row_count,
              size_bytes: Some(p.size_bytes),
            })
          })
          .collect()
      })
      .await
  }
}
