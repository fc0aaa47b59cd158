//! Partition-pruning probe: the same aggregate with and without a partition
//! predicate, timed over several iterations.

use std::time::Duration;

use olap_core::{
  PartitionFilter,
  query::{QueryEngine, QueryResult},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result, patterns::partition_scan};

/// Speedup at which pruning is judged effective. A heuristic for
/// demonstrations, not a correctness property.
pub const DEFAULT_THRESHOLD: f64 = 1.5;

pub const DEFAULT_ITERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
  pub threshold:  f64,
  pub iterations: usize,
}

impl Default for PruningConfig {
  fn default() -> Self {
    Self {
      threshold:  DEFAULT_THRESHOLD,
      iterations: DEFAULT_ITERATIONS,
    }
  }
}

impl PruningConfig {
  pub fn validate(&self) -> Result<()> {
    if !(self.threshold.is_finite() && self.threshold > 0.0) {
      return Err(Error::InvalidPattern(format!(
        "pruning threshold {} must be a positive number",
        self.threshold
      )));
    }
    if self.iterations == 0 {
      return Err(Error::InvalidPattern("pruning needs at least one iteration".into()));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PruningReport {
  pub filter:        PartitionFilter,
  pub iterations:    usize,
  pub full_scan_ms:  f64,
  pub pruned_ms:     f64,
  pub speedup:       f64,
  pub time_saved_ms: f64,
  pub threshold:     f64,
  pub effective:     bool,
  pub full_rows:     i64,
  pub pruned_rows:   i64,
}

/// `full / pruned`. A zero pruned time counts as infinitely faster unless
/// the full scan was also instant.
pub fn speedup(full: Duration, pruned: Duration) -> f64 {
  if pruned.is_zero() {
    if full.is_zero() { 1.0 } else { f64::INFINITY }
  } else {
    full.as_secs_f64() / pruned.as_secs_f64()
  }
}

fn mean(samples: &[Duration]) -> Duration {
  let total: Duration = samples.iter().sum();
  total / u32::try_from(samples.len().max(1)).unwrap_or(u32::MAX)
}

fn row_count(result: &QueryResult) -> Result<i64> {
  let idx = result
    .column_index("row_count")
    .ok_or_else(|| Error::MissingColumn("row_count".into()))?;
  Ok(
    result
      .rows
      .first()
      .and_then(|row| row[idx].as_int())
      .unwrap_or(0),
  )
}

async fn time_scan<E: QueryEngine>(
  engine: &E,
  sql: &str,
  iterations: usize,
) -> Result<(Duration, i64)> {
  let mut samples = Vec::with_capacity(iterations);
  let mut rows = 0;
  for _ in 0..iterations {
    let result = engine.execute(sql).await.map_err(Error::engine)?;
    rows = row_count(&result)?;
    samples.push(result.elapsed);
  }
  Ok((mean(&samples), rows))
}

/// Run the full and the filtered scan `config.iterations` times each and
/// compare mean engine times.
pub async fn compare_pruning<E: QueryEngine>(
  engine: &E,
  filter: &PartitionFilter,
  config: &PruningConfig,
) -> Result<PruningReport> {
  config.validate()?;
  if filter.is_empty() {
    return Err(Error::InvalidPattern(
      "pruning comparison needs a partition filter".into(),
    ));
  }

  let (full, full_rows) =
    time_scan(engine, &partition_scan(&PartitionFilter::all()), config.iterations).await?;
  let (pruned, pruned_rows) =
    time_scan(engine, &partition_scan(filter), config.iterations).await?;

  let ratio = speedup(full, pruned);
  let report = PruningReport {
    filter: *filter,
    iterations: config.iterations,
    full_scan_ms: full.as_secs_f64() * 1000.0,
    pruned_ms: pruned.as_secs_f64() * 1000.0,
    speedup: ratio,
    time_saved_ms: (full.as_secs_f64() - pruned.as_secs_f64()) * 1000.0,
    threshold: config.threshold,
    effective: ratio >= config.threshold,
    full_rows,
    pruned_rows,
  };
  info!(
    speedup = report.speedup,
    effective = report.effective,
    full_rows,
    pruned_rows,
    "partition pruning comparison"
  );
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn speedup_handles_instant_scans() {
    let ms = Duration::from_millis;
    assert_eq!(speedup(ms(30), ms(10)), 3.0);
    assert_eq!(speedup(ms(0), ms(0)), 1.0);
    assert!(speedup(ms(5), ms(0)).is_infinite());
  }

  #[test]
  fn mean_of_samples() {
    let ms = Duration::from_millis;
    assert_eq!(mean(&[ms(10), ms(20), ms(30)]), ms(20));
    assert_eq!(mean(&[]), Duration::ZERO);
  }

  #[test]
  fn config_validation() {
    assert!(PruningConfig::default().validate().is_ok());
    assert!(PruningConfig { threshold: 0.0, ..Default::default() }.validate().is_err());
    assert!(PruningConfig { threshold: f64::NAN, ..Default::default() }.validate().is_err());
    assert!(PruningConfig { iterations: 0, ..Default::default() }.validate().is_err());
  }
}
