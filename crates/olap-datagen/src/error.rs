//! Error types for `olap-datagen`.

use olap_core::TableName;
use rand::distr::weighted::Error as WeightError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("dimension {0} is empty")]
  EmptyDimension(TableName),

  #[error("invalid sampling weights: {0}")]
  Weights(#[from] WeightError),

  #[error(transparent)]
  Core(#[from] olap_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fail with [`Error::Config`] unless `count` is positive.
pub(crate) fn require_positive(name: &str, count: usize) -> Result<()> {
  if count == 0 {
    return Err(Error::Config(format!("{name} must be positive")));
  }
  Ok(())
}
