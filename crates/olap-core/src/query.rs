//! The `QueryEngine` trait: an analytical SQL engine the query patterns run on.

use std::{future::Future, time::Duration};

use serde::Serialize;

use crate::value::{RowSet, Value};

/// Rows produced by a query, with the engine's wall-clock time.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<Value>>,
  #[serde(with = "duration_ms")]
  pub elapsed: Duration,
}

impl QueryResult {
  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  pub fn into_row_set(self) -> RowSet {
    RowSet { columns: self.columns, rows: self.rows }
  }
}

pub trait QueryEngine: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn execute<'a>(
    &'a self,
    sql: &'a str,
  ) -> impl Future<Output = Result<QueryResult, Self::Error>> + Send + 'a;
}

mod duration_ms {
  use std::time::Duration;

  use serde::Serializer;

  pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
  }
}
