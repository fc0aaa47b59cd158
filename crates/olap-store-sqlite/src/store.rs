//! [`SqliteStore`]: the SQLite implementation of [`TableStore`] and
//! [`QueryEngine`].

use std::{path::Path, time::Instant};

use olap_core::{
  Partitioning, PartitionKey, RowSet, TableName,
  fact::SALES_DATE_COLUMN,
  partition::{PARTITION_COLUMNS, QUARTER_COLUMN, YEAR_COLUMN, tag_partitions},
  query::{QueryEngine, QueryResult},
  store::{PartitionInfo, ReadFilter, TableMetadata, TableStore},
  value::ColumnType,
};
use rusqlite::types::Value as SqlValue;
use tracing::{debug, info};

use crate::{
  Error, Result,
  encode::{decode_typed, decode_untyped, encode_value},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The star schema in a single SQLite database.
///
/// Cloning is cheap; the inner connection is reference-counted. Clones share
/// one connection thread, so concurrent calls are serialised rather than
/// interleaved.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a database at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory database; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Columns of `table` as stored here: the schema plus, for the fact
  /// table, the partition columns.
  fn stored_columns(table: TableName) -> Vec<(String, ColumnType)> {
    table
      .schema()
      .iter()
      .chain(table.partitioning().columns())
      .map(|c| (c.name.to_owned(), c.ty))
      .collect()
  }

  /// Bytes of the pages holding `table` and its indexes.
  ///
  /// Uses the `dbstat` virtual table; builds without it report the size of
  /// the whole database (`page_count * page_size`) instead.
  async fn table_size(&self, table: TableName) -> Result<u64> {
    let name = table.as_str();
    let bytes: i64 = self
      .conn
      .call(move |conn| {
        let per_table = conn.query_row(
          "SELECT COALESCE(SUM(pgsize), 0) FROM dbstat
           WHERE name IN (SELECT name FROM sqlite_master WHERE tbl_name = ?1)",
          [name],
          |row| row.get(0),
        );
        match per_table {
          Ok(bytes) => Ok(bytes),
          Err(_) => Ok(conn.query_row(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
            [],
            |row| row.get(0),
          )?),
        }
      })
      .await?;
    Ok(bytes.unsigned_abs())
  }

  /// Check `rows` against the fixed schema, deriving partition columns for
  /// an unpartitioned write of the fact table.
  fn prepare_rows(
    table: TableName,
    rows: RowSet,
    partitioning: Partitioning,
  ) -> Result<RowSet> {
    let has_partition_columns = PARTITION_COLUMNS
      .iter()
      .all(|c| rows.column_index(c.name).is_some());

    let rows = match (partitioning, table.partitioning()) {
      (Partitioning::YearQuarter, Partitioning::None) => {
        return Err(Error::UnsupportedPartitioning(table));
      }
      (Partitioning::YearQuarter, Partitioning::YearQuarter) => {
        if !has_partition_columns {
          let missing = PARTITION_COLUMNS
            .iter()
            .filter(|c| rows.column_index(c.name).is_none())
            .map(|c| c.name.to_owned())
            .collect();
          return Err(olap_core::Error::MissingPartitionColumns { table, missing }.into());
        }
        rows
      }
      (Partitioning::None, Partitioning::YearQuarter) if !has_partition_columns => {
        tag_partitions(rows, SALES_DATE_COLUMN)?
      }
      (Partitioning::None, _) => rows,
    };

    for column in &rows.columns {
      table.require_column_type(column)?;
    }
    for (name, _) in Self::stored_columns(table) {
      if rows.column_index(&name).is_none() {
        return Err(olap_core::Error::MissingColumn(name).into());
      }
    }
    Ok(rows)
  }
}

// ─── TableStore impl ─────────────────────────────────────────────────────────

impl TableStore for SqliteStore {
  type Error = Error;

  async fn write(
    &self,
    table: TableName,
    rows: RowSet,
    partitioning: Partitioning,
  ) -> Result<()> {
    let rows = Self::prepare_rows(table, rows, partitioning)?;
    let count = rows.len();

    let placeholders = vec!["?"; rows.columns.len()].join(", ");
    let insert_sql = format!(
      "INSERT INTO {table} ({}) VALUES ({placeholders})",
      rows.columns.join(", ")
    );
    let delete_sql = format!("DELETE FROM {table}");
    let encoded: Vec<Vec<SqlValue>> = rows
      .rows
      .iter()
      .map(|row| row.iter().map(encode_value).collect())
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(&delete_sql, [])?;
        {
          let mut stmt = tx.prepare(&insert_sql)?;
          for row in encoded {
            stmt.execute(rusqlite::params_from_iter(row))?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    info!(%table, rows = count, "wrote sqlite table");
    Ok(())
  }

  async fn read(&self, table: TableName, filter: &ReadFilter) -> Result<RowSet> {
    if !filter.partition.is_empty() && table.partitioning() == Partitioning::None {
      return Err(olap_core::Error::NotPartitioned(table).into());
    }

    let columns: Vec<(String, ColumnType)> = if filter.columns.is_empty() {
      Self::stored_columns(table)
    } else {
      filter
        .columns
        .iter()
        .map(|c| Ok((c.clone(), table.require_column_type(c)?)))
        .collect::<Result<_>>()?
    };

    let select = columns
      .iter()
      .map(|(name, _)| name.as_str())
      .collect::<Vec<_>>()
      .join(", ");
    let where_clause = filter
      .partition
      .to_sql_predicate()
      .map(|p| format!(" WHERE {p}"))
      .unwrap_or_default();
    let sql = format!("SELECT {select} FROM {table}{where_clause} ORDER BY rowid");
    debug!(%sql, "reading sqlite table");

    let width = columns.len();
    let raws: Vec<Vec<SqlValue>> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| {
            (0..width)
              .map(|i| row.get::<_, SqlValue>(i))
              .collect::<rusqlite::Result<Vec<_>>>()
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut out = RowSet::new(columns.iter().map(|(name, _)| name.clone()).collect());
    for raw in raws {
      let row = columns
        .iter()
        .zip(raw)
        .map(|((name, ty), cell)| decode_typed(name, *ty, cell))
        .collect::<Result<Vec<_>>>()?;
      out.push(row)?;
    }
    Ok(out)
  }

  async fn metadata(&self, table: TableName) -> Result<TableMetadata> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let count: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
      .await?;

    Ok(TableMetadata {
      table,
      row_count: count.unsigned_abs(),
      column_count: Self::stored_columns(table).len(),
      size_bytes: Some(self.table_size(table).await?),
    })
  }

  async fn partitions(&self, table: TableName) -> Result<Vec<PartitionInfo>> {
    if table.partitioning() == Partitioning::None {
      return Ok(Vec::new());
    }

    let sql = format!(
      "SELECT {YEAR_COLUMN}, {QUARTER_COLUMN}, COUNT(*) FROM {table}
       GROUP BY {YEAR_COLUMN}, {QUARTER_COLUMN}
       ORDER BY {YEAR_COLUMN}, {QUARTER_COLUMN}"
    );
    let raws: Vec<(i64, String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // Partitions share one b-tree, so bytes are apportioned by row share.
    let total_bytes = self.table_size(table).await?;
    let total_rows: i64 = raws.iter().map(|(_, _, count)| count).sum();
    let share = |count: i64| {
      if total_rows == 0 {
        0
      } else {
        (total_bytes as f64 * count as f64 / total_rows as f64).round() as u64
      }
    };

    raws
      .into_iter()
      .map(|(year, quarter, count)| {
        let year = i32::try_from(year).map_err(|_| olap_core::Error::InvalidValue {
          column: YEAR_COLUMN.to_owned(),
          value:  year.to_string(),
        })?;
        Ok(PartitionInfo {
          key:        PartitionKey::new(year, quarter.parse()?),
          row_count:  count.unsigned_abs(),
          size_bytes: Some(share(count)),
        })
      })
      .collect()
  }
}

// ─── QueryEngine impl ────────────────────────────────────────────────────────

impl QueryEngine for SqliteStore {
  type Error = Error;

  async fn execute(&self, sql: &str) -> Result<QueryResult> {
    let sql = sql.to_owned();
    let (columns, raws, elapsed) = self
      .conn
      .call(move |conn| {
        let started = Instant::now();
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> =
          stmt.column_names().into_iter().map(str::to_owned).collect();
        let width = columns.len();
        let rows = stmt
          .query_map([], |row| {
            (0..width)
              .map(|i| row.get::<_, SqlValue>(i))
              .collect::<rusqlite::Result<Vec<_>>>()
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((columns, rows, started.elapsed()))
      })
      .await?;

    let rows = raws
      .into_iter()
      .map(|raw| raw.into_iter().map(decode_untyped).collect())
      .collect();
    debug!(?elapsed, "executed query");
    Ok(QueryResult { columns, rows, elapsed })
  }
}
