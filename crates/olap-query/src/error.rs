//! Error type for `olap-query`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown attribute {0:?}")]
  UnknownAttribute(String),

  #[error("unknown metric {0:?}")]
  UnknownMetric(String),

  #[error("invalid query pattern: {0}")]
  InvalidPattern(String),

  #[error("result is missing column {0:?}")]
  MissingColumn(String),

  #[error("query engine error: {0}")]
  Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn engine<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Engine(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
