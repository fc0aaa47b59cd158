//! Storage-format benchmark: timed reads of the same table from several
//! stores, compared on latency and on-disk size.

use std::{
  future::Future,
  time::{Duration, Instant},
};

use olap_core::{
  TableName,
  query::QueryEngine,
  store::{ReadFilter, TableStore},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

pub const DEFAULT_BENCHMARK_ITERATIONS: usize = 3;

pub const DEFAULT_WARMUP: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
  /// Timed runs per format.
  pub iterations: usize,
  /// Untimed runs before the timed ones.
  pub warmup:     usize,
}

impl Default for BenchmarkConfig {
  fn default() -> Self {
    Self {
      iterations: DEFAULT_BENCHMARK_ITERATIONS,
      warmup:     DEFAULT_WARMUP,
    }
  }
}

impl BenchmarkConfig {
  pub fn validate(&self) -> Result<()> {
    if self.iterations == 0 {
      return Err(Error::InvalidPattern("benchmark needs at least one iteration".into()));
    }
    Ok(())
  }
}

// ─── Timing statistics ───────────────────────────────────────────────────────

/// Summary of a set of timed runs, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingStats {
  pub runs:    usize,
  pub mean_ms: f64,
  pub min_ms:  f64,
  pub max_ms:  f64,
  pub p50_ms:  f64,
  pub p95_ms:  f64,
}

impl TimingStats {
  /// `None` for an empty sample set. Percentiles use the nearest rank at or
  /// above `p * runs`, capped at the slowest run.
  pub fn from_samples(samples: &[Duration]) -> Option<Self> {
    if samples.is_empty() {
      return None;
    }
    let mut ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
    ms.sort_by(f64::total_cmp);

    let rank = |p: f64| ms[((ms.len() as f64 * p) as usize).min(ms.len() - 1)];
    Some(Self {
      runs:    ms.len(),
      mean_ms: ms.iter().sum::<f64>() / ms.len() as f64,
      min_ms:  ms[0],
      max_ms:  ms[ms.len() - 1],
      p50_ms:  rank(0.5),
      p95_ms:  rank(0.95),
    })
  }
}

// ─── Per-format runs ─────────────────────────────────────────────────────────

/// One store's result for a benchmarked table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatBenchmark {
  pub format:            String,
  pub table:             TableName,
  pub row_count:         u64,
  pub size_bytes:        Option<u64>,
  pub timings:           TimingStats,
  /// Largest reported size among the compared formats over this one's.
  /// Filled in by [`compare_formats`].
  pub compression_ratio: Option<f64>,
  /// Slowest mean over this format's mean. Filled in by [`compare_formats`].
  pub speedup:           Option<f64>,
}

async fn timed<F, Fut, T, E>(config: &BenchmarkConfig, mut run: F) -> Result<(TimingStats, T)>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = std::result::Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  config.validate()?;
  for _ in 0..config.warmup {
    run().await.map_err(Error::engine)?;
  }

  let mut samples = Vec::with_capacity(config.iterations);
  let mut last = None;
  for _ in 0..config.iterations {
    let start = Instant::now();
    let out = run().await.map_err(Error::engine)?;
    samples.push(start.elapsed());
    last = Some(out);
  }

  match (TimingStats::from_samples(&samples), last) {
    (Some(stats), Some(out)) => Ok((stats, out)),
    _ => Err(Error::InvalidPattern("benchmark needs at least one iteration".into())),
  }
}

/// Read the whole of `table` from `store` `config.iterations` times.
pub async fn benchmark_store<S: TableStore>(
  store: &S,
  format: &str,
  table: TableName,
  config: &BenchmarkConfig,
) -> Result<FormatBenchmark> {
  let filter = &ReadFilter::all();
  let (timings, rows) = timed(config, move || store.read(table, filter)).await?;
  let metadata = store.metadata(table).await.map_err(Error::engine)?;
  debug!(format, %table, rows = rows.len(), "benchmarked store reads");

  Ok(FormatBenchmark {
    format: format.to_owned(),
    table,
    row_count: metadata.row_count,
    size_bytes: metadata.size_bytes,
    timings,
    compression_ratio: None,
    speedup: None,
  })
}

/// Time `sql` on `engine`, using the engine's own elapsed time per run.
pub async fn benchmark_query<E: QueryEngine>(
  engine: &E,
  sql: &str,
  config: &BenchmarkConfig,
) -> Result<TimingStats> {
  config.validate()?;
  for _ in 0..config.warmup {
    engine.execute(sql).await.map_err(Error::engine)?;
  }
  let mut samples = Vec::with_capacity(config.iterations);
  for _ in 0..config.iterations {
    samples.push(engine.execute(sql).await.map_err(Error::engine)?.elapsed);
  }
  TimingStats::from_samples(&samples)
    .ok_or_else(|| Error::InvalidPattern("benchmark needs at least one iteration".into()))
}

// ─── Comparison ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
  pub table:    TableName,
  pub formats:  Vec<FormatBenchmark>,
  /// Format with the lowest mean read time.
  pub fastest:  Option<String>,
  /// Format with the smallest reported size.
  pub smallest: Option<String>,
}

/// Rank the per-format results against each other.
pub fn compare_formats(table: TableName, mut formats: Vec<FormatBenchmark>) -> BenchmarkReport {
  let largest = formats.iter().filter_map(|f| f.size_bytes).max();
  let slowest = formats
    .iter()
    .map(|f| f.timings.mean_ms)
    .fold(0.0_f64, f64::max);

  for f in &mut formats {
    f.compression_ratio = match (largest, f.size_bytes) {
      (Some(largest), Some(size)) if size > 0 => Some(largest as f64 / size as f64),
      _ => None,
    };
    f.speedup = (f.timings.mean_ms > 0.0).then(|| slowest / f.timings.mean_ms);
  }

  let fastest = formats
    .iter()
    .min_by(|a, b| a.timings.mean_ms.total_cmp(&b.timings.mean_ms))
    .map(|f| f.format.clone());
  let smallest = formats
    .iter()
    .filter(|f| f.size_bytes.is_some())
    .min_by_key(|f| f.size_bytes)
    .map(|f| f.format.clone());

  info!(%table, fastest = ?fastest, smallest = ?smallest, "storage format comparison");
  BenchmarkReport { table, formats, fastest, smallest }
}
