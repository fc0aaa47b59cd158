//! On-disk layout shared by the file-backed stores.
//!
//! ```text
//! <root>/<table>/<table>.<ext>                        unpartitioned
//! <root>/<table>/year=<yyyy>/quarter=<Qn>/data.<ext>  year/quarter
//! ```
//!
//! Partition columns are encoded only in directory names. They are stripped
//! from rows on write and re-attached from the path on read.

use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
  Error, Result,
  partition::{PARTITION_COLUMNS, PartitionFilter, PartitionKey, row_partition_keys},
  table::{Partitioning, TableName},
  value::RowSet,
};

/// File name of every partition's data file, without extension.
pub const PARTITION_FILE_STEM: &str = "data";

/// A data file of a table, with the partition it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
  pub path:       PathBuf,
  pub partition:  Option<PartitionKey>,
  pub size_bytes: u64,
}

/// Files found under one partition directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFiles {
  pub key:        PartitionKey,
  pub files:      Vec<DataFile>,
  pub size_bytes: u64,
}

/// Where one table lives on disk for a given file extension.
#[derive(Debug, Clone)]
pub struct TableLayout {
  root:      PathBuf,
  table:     TableName,
  extension: &'static str,
}

impl TableLayout {
  pub fn new(root: impl Into<PathBuf>, table: TableName, extension: &'static str) -> Self {
    Self { root: root.into(), table, extension }
  }

  pub fn table(&self) -> TableName { self.table }

  pub fn table_dir(&self) -> PathBuf { self.root.join(self.table.as_str()) }

  pub fn unpartitioned_file(&self) -> PathBuf {
    self
      .table_dir()
      .join(format!("{}.{}", self.table.as_str(), self.extension))
  }

  pub fn partition_dir(&self, key: &PartitionKey) -> PathBuf {
    self.table_dir().join(key.relative_path())
  }

  pub fn partition_file(&self, key: &PartitionKey) -> PathBuf {
    self
      .partition_dir(key)
      .join(format!("{PARTITION_FILE_STEM}.{}", self.extension))
  }

  /// Remove any previous content of the table and recreate its directory.
  pub fn reset(&self) -> Result<()> {
    let dir = self.table_dir();
    if dir.exists() {
      fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;
    Ok(())
  }

  /// Every partition directory holding at least one data file, sorted by key.
  ///
  /// Directories whose path does not parse as a partition are ignored.
  pub fn discover(&self) -> Result<Vec<PartitionFiles>> {
    let table_dir = self.table_dir();
    if !table_dir.exists() {
      return Ok(Vec::new());
    }

    let mut found: BTreeMap<PartitionKey, PartitionFiles> = BTreeMap::new();
    for file in self.data_files_under(&table_dir)? {
      let Some(parent) = file.parent() else { continue };
      if parent == table_dir {
        continue;
      }
      let Ok(relative) = parent.strip_prefix(&table_dir) else {
        continue;
      };
      let relative = relative.to_string_lossy().replace('\\', "/");
      let Ok(key) = PartitionKey::from_path(&relative) else {
        debug!(path = %parent.display(), "skipping non-partition directory");
        continue;
      };

      let size = fs::metadata(&file)?.len();
      let entry = found.entry(key).or_insert_with(|| PartitionFiles {
        key,
        files: Vec::new(),
        size_bytes: 0,
      });
      entry.files.push(DataFile {
        path:       file,
        partition:  Some(key),
        size_bytes: size,
      });
      entry.size_bytes += size;
    }

    Ok(found.into_values().collect())
  }

  /// Data files to scan for `filter`, after directory-level pruning.
  ///
  /// A single table file takes precedence over partition directories, so a
  /// partitionable table written unpartitioned reads back as one file.
  pub fn files(&self, filter: &PartitionFilter) -> Result<Vec<DataFile>> {
    let single = self.unpartitioned_file();
    if single.exists() || self.table.partitioning() == Partitioning::None {
      if !filter.is_empty() {
        return Err(Error::NotPartitioned(self.table));
      }
      if !single.exists() {
        return Ok(Vec::new());
      }
      let size_bytes = fs::metadata(&single)?.len();
      return Ok(vec![DataFile { path: single, partition: None, size_bytes }]);
    }

    let partitions = self.discover()?;
    let total = partitions.len();
    let files: Vec<DataFile> = partitions
      .into_iter()
      .filter(|p| filter.matches(&p.key))
      .flat_map(|p| p.files)
      .collect();
    debug!(
      table = %self.table,
      partitions = total,
      files = files.len(),
      "pruned partition directories"
    );
    Ok(files)
  }

  /// Total bytes of every data file of the table.
  pub fn size_bytes(&self) -> Result<u64> {
    let table_dir = self.table_dir();
    if !table_dir.exists() {
      return Ok(0);
    }
    self
      .data_files_under(&table_dir)?
      .iter()
      .try_fold(0, |acc: u64, f| -> Result<u64> {
        Ok(acc + fs::metadata(f)?.len())
      })
  }

  fn data_files_under(&self, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
      for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.is_dir() {
          stack.push(path);
        } else if path.extension().is_some_and(|e| e == self.extension) {
          out.push(path);
        }
      }
    }
    out.sort();
    Ok(out)
  }
}

// ─── Row splitting ───────────────────────────────────────────────────────────

/// Group partition-tagged rows by key, dropping the partition columns.
pub fn split_by_partition(
  table: TableName,
  rows: RowSet,
) -> Result<BTreeMap<PartitionKey, RowSet>> {
  let missing: Vec<String> = PARTITION_COLUMNS
    .iter()
    .filter(|c| rows.column_index(c.name).is_none())
    .map(|c| c.name.to_owned())
    .collect();
  if !missing.is_empty() {
    return Err(Error::MissingPartitionColumns { table, missing });
  }

  let keys = row_partition_keys(&rows)?;
  let keep: Vec<usize> = (0..rows.columns.len())
    .filter(|&i| PARTITION_COLUMNS.iter().all(|c| c.name != rows.columns[i]))
    .collect();
  let columns: Vec<String> = keep.iter().map(|&i| rows.columns[i].clone()).collect();

  let mut out: BTreeMap<PartitionKey, RowSet> = BTreeMap::new();
  for (key, row) in keys.into_iter().zip(rows.rows) {
    let projected = keep.iter().map(|&i| row[i].clone()).collect();
    out
      .entry(key)
      .or_insert_with(|| RowSet::new(columns.clone()))
      .rows
      .push(projected);
  }
  Ok(out)
}

/// Append the partition columns of `key` to every row.
pub fn attach_partition(mut rows: RowSet, key: &PartitionKey) -> RowSet {
  let values = key.values();
  for row in &mut rows.rows {
    row.extend(values.iter().cloned());
  }
  rows
    .columns
    .extend(PARTITION_COLUMNS.iter().map(|c| c.name.to_owned()));
  rows
}
