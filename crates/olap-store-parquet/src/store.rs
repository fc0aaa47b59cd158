//! [`ParquetStore`]: Hive-partitioned Parquet files behind [`TableStore`].

use std::{
  fs::File,
  path::{Path, PathBuf},
};

use olap_core::{
  Partitioning, PartitionFilter, RowSet, TableName,
  layout::{DataFile, TableLayout, attach_partition, split_by_partition},
  store::{PartitionInfo, ReadFilter, TableMetadata, TableStore},
};
use parquet::{
  arrow::{ArrowWriter, ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder},
  basic::Compression,
  file::{
    properties::WriterProperties,
    reader::{FileReader, SerializedFileReader},
  },
};
use tracing::{debug, info};

use crate::{
  Error, Result,
  columnar::{append_batch, to_batch},
};

pub const EXTENSION: &str = "parquet";

/// Parquet files under a root directory, one subdirectory per table.
#[derive(Debug, Clone)]
pub struct ParquetStore {
  root: PathBuf,
}

impl ParquetStore {
  /// A store rooted at `root`. Nothing is created until the first write.
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  fn layout(&self, table: TableName) -> TableLayout {
    TableLayout::new(&self.root, table, EXTENSION)
  }

  /// Run blocking file work for `table` off the async runtime.
  async fn blocking<T, F>(&self, table: TableName, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(TableLayout) -> Result<T> + Send + 'static,
  {
    let layout = self.layout(table);
    tokio::task::spawn_blocking(move || f(layout)).await?
  }
}

// ─── Files ───────────────────────────────────────────────────────────────────

fn write_file(path: &Path, table: TableName, rows: &RowSet) -> Result<()> {
  let batch = to_batch(table, rows)?;
  let props = WriterProperties::builder()
    .set_compression(Compression::SNAPPY)
    .build();
  let mut writer = ArrowWriter::try_new(File::create(path)?, batch.schema(), Some(props))?;
  writer.write(&batch)?;
  writer.close()?;
  Ok(())
}

/// Read a file, decoding only the stored columns named in `wanted` (all of
/// them when `wanted` is empty).
fn read_file(path: &Path, table: TableName, wanted: &[String]) -> Result<RowSet> {
  let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
  let stored: Vec<String> = builder
    .schema()
    .fields()
    .iter()
    .map(|f| f.name().clone())
    .collect();

  let mut indices: Vec<usize> = (0..stored.len())
    .filter(|&i| wanted.is_empty() || wanted.contains(&stored[i]))
    .collect();
  if indices.is_empty() && !stored.is_empty() {
    // Row counts need at least one decoded column.
    indices.push(0);
  }

  let mask = ProjectionMask::roots(builder.parquet_schema(), indices.iter().copied());
  let reader = builder.with_projection(mask).build()?;

  let mut rows = RowSet::new(indices.iter().map(|&i| stored[i].clone()).collect());
  for batch in reader {
    append_batch(table, &mut rows, &batch?)?;
  }
  Ok(rows)
}

/// `(rows, columns)` from the file footer.
fn footer_counts(path: &Path) -> Result<(u64, usize)> {
  let reader = SerializedFileReader::new(File::open(path)?)?;
  let meta = reader.metadata().file_metadata();
  Ok((
    meta.num_rows().unsigned_abs(),
    meta.schema_descr().num_columns(),
  ))
}

fn read_files(
  table: TableName,
  files: &[DataFile],
  columns: &[String],
) -> Result<Option<RowSet>> {
  let mut out: Option<RowSet> = None;
  for data_file in files {
    let mut rows = read_file(&data_file.path, table, columns)?;
    if let Some(key) = &data_file.partition {
      rows = attach_partition(rows, key);
    }
    if let Some(acc) = out.as_mut() {
      if acc.columns != rows.columns {
        return Err(Error::SchemaMismatch { path: data_file.path.clone() });
      }
      acc.rows.extend(rows.rows);
    } else {
      out = Some(rows);
    }
  }
  Ok(out)
}

// ─── TableStore impl ─────────────────────────────────────────────────────────

impl TableStore for ParquetStore {
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

    let count = rows.len();
    let files = self
      .blocking(table, move |layout| {
        layout.reset()?;
        match partitioning {
          Partitioning::None => {
            write_file(&layout.unpartitioned_file(), table, &rows)?;
            Ok(1)
          }
          Partitioning::YearQuarter => {
            let parts = split_by_partition(table, rows)?;
            for (key, part) in &parts {
              std::fs::create_dir_all(layout.partition_dir(key))?;
              write_file(&layout.partition_file(key), table, part)?;
              debug!(%table, partition = %key, rows = part.len(), "wrote parquet partition");
            }
            Ok(parts.len())
          }
        }
      })
      .await?;

    info!(%table, rows = count, files, "wrote parquet table");
    Ok(())
  }

  async fn read(&self, table: TableName, filter: &ReadFilter) -> Result<RowSet> {
    for column in &filter.columns {
      table.require_column_type(column)?;
    }
    let partition = filter.partition;
    let columns = filter.columns.clone();

    self
      .blocking(table, move |layout| {
        let files = layout.files(&partition)?;
        let rows = match read_files(table, &files, &columns)? {
          Some(rows) => rows,
          None => {
            let mut names = table.column_names();
            names.extend(
              table
                .partitioning()
                .columns()
                .iter()
                .map(|c| c.name.to_owned()),
            );
            RowSet::new(names)
          }
        };
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
      .blocking(table, move |layout| {
        let files = layout.files(&PartitionFilter::all())?;
        let mut row_count = 0;
        let mut size_bytes = 0;
        let mut column_count = table.schema().len();
        for (i, f) in files.iter().enumerate() {
          let (rows, columns) = footer_counts(&f.path)?;
          row_count += rows;
          size_bytes += f.size_bytes;
          if i == 0 {
            column_count = columns
              + f
                .partition
                .map_or(0, |_| table.partitioning().columns().len());
          }
        }
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
      .blocking(table, move |layout| {
        layout
          .discover()?
          .into_iter()
          .map(|p| {
            let row_count = p
              .files
              .iter()
              .map(|f| footer_counts(&f.path).map(|(rows, _)| rows))
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
