//! Blocking single-file CSV reads and writes.

use std::path::Path;

use olap_core::{RowSet, TableName, Value};

use crate::Result;

/// Write `rows` with a header line.
pub fn write_rows(path: &Path, delimiter: u8, rows: &RowSet) -> Result<()> {
  let mut writer = csv::WriterBuilder::new()
    .delimiter(delimiter)
    .from_path(path)?;
  writer.write_record(&rows.columns)?;
  for row in &rows.rows {
    writer.write_record(row.iter().map(Value::to_text))?;
  }
  writer.flush()?;
  Ok(())
}

/// Read a file of `table`, typing each column by its header name.
pub fn read_rows(path: &Path, delimiter: u8, table: TableName) -> Result<RowSet> {
  let mut reader = csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .has_headers(true)
    .from_path(path)?;

  let columns: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
  let types = columns
    .iter()
    .map(|c| table.require_column_type(c))
    .collect::<olap_core::Result<Vec<_>>>()?;

  let mut rows = RowSet::new(columns);
  for record in reader.records() {
    let record = record?;
    let row = rows
      .columns
      .iter()
      .zip(&types)
      .zip(record.iter())
      .map(|((name, ty), raw)| ty.parse(name, raw))
      .collect::<olap_core::Result<Vec<_>>>()?;
    rows.push(row)?;
  }
  Ok(rows)
}

/// Number of data records, excluding the header.
pub fn count_rows(path: &Path, delimiter: u8) -> Result<u64> {
  let mut reader = csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .has_headers(true)
    .from_path(path)?;
  let mut record = csv::ByteRecord::new();
  let mut count = 0;
  while reader.read_byte_record(&mut record)? {
    count += 1;
  }
  Ok(count)
}

/// Column names from the header line.
pub fn header(path: &Path, delimiter: u8) -> Result<Vec<String>> {
  let mut reader = csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .has_headers(true)
    .from_path(path)?;
  Ok(reader.headers()?.iter().map(str::to_owned).collect())
}
