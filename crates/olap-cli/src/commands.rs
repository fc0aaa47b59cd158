//! Subcommand handlers. Each one opens the store it needs, does its work and
//! prints to stdout; progress goes through `tracing`.

use std::{fmt, path::Path};

use anyhow::{Context as _, Result, anyhow, bail, ensure};
use clap::ValueEnum;
use olap_core::{
  PartitionFilter, TableName, Value,
  dimension::DimProduct,
  query::{QueryEngine, QueryResult},
  store::{ReadFilter, TableStore},
  validate::{
    DimensionKeys, ForeignKey, IntegrityReport, check_referential_integrity_rows,
    validate_scd_type2,
  },
};
use olap_datagen::Dataset;
use olap_query::{
  Attribute, BenchmarkConfig, BenchmarkReport, Filter, Pattern, PruningConfig, benchmark_store,
  compare_formats, compare_pruning,
};
use olap_store_csv::CsvStore;
use olap_store_parquet::ParquetStore;
use olap_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::info;

use crate::{
  config::CliConfig,
  output::{format_bytes, format_elapsed, header, render_table, to_json},
};

// ─── Formats ─────────────────────────────────────────────────────────────────

/// A storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
  Parquet,
  Csv,
  Sqlite,
}

impl Format {
  pub const ALL: [Format; 3] = [Self::Parquet, Self::Csv, Self::Sqlite];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Parquet => "parquet",
      Self::Csv => "csv",
      Self::Sqlite => "sqlite",
    }
  }
}

impl fmt::Display for Format {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Where `generate` writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  Parquet,
  Csv,
  Sqlite,
  All,
}

impl OutputFormat {
  pub fn formats(self) -> Vec<Format> {
    match self {
      Self::Parquet => vec![Format::Parquet],
      Self::Csv => vec![Format::Csv],
      Self::Sqlite => vec![Format::Sqlite],
      Self::All => Format::ALL.to_vec(),
    }
  }
}

async fn open_sqlite(path: &Path, create: bool) -> Result<SqliteStore> {
  if create {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("creating {}", parent.display()))?;
    }
  } else {
    ensure!(
      path.exists(),
      "no SQLite database at {}; run `olap generate --format sqlite` first",
      path.display()
    );
  }
  SqliteStore::open(path)
    .await
    .with_context(|| format!("opening {}", path.display()))
}

fn csv_store(config: &CliConfig) -> Result<CsvStore> {
  Ok(CsvStore::new(config.csv_root()).with_delimiter(config.delimiter()?))
}

// ─── generate ────────────────────────────────────────────────────────────────

pub async fn generate(config: &CliConfig, formats: &[Format], validate: bool) -> Result<()> {
  let dataset = Dataset::generate(&config.dataset).context("generating dataset")?;

  if validate {
    let report = dataset.validate().context("validating dataset")?;
    ensure_integrity(&report)?;
    info!("dataset passed validation");
  }

  for &format in formats {
    match format {
      Format::Parquet => write_dataset(&ParquetStore::new(config.parquet_root()), &dataset).await?,
      Format::Csv => write_dataset(&csv_store(config)?, &dataset).await?,
      Format::Sqlite => {
        let store = open_sqlite(&config.sqlite_path(), true).await?;
        write_dataset(&store, &dataset).await?;
      }
    }
    info!(%format, dir = %config.output_dir.display(), "dataset written");
  }

  let rows: Vec<Vec<Value>> = TableName::ALL
    .into_iter()
    .map(|t| vec![t.as_str().into(), (dataset.row_count(t) as i64).into()])
    .collect();
  print!("{}", render_table(&header(&["table", "rows"]), &rows));
  Ok(())
}

async fn write_dataset<S: TableStore>(store: &S, dataset: &Dataset) -> Result<()> {
  for table in TableName::ALL {
    let rows = dataset
      .table(table)
      .with_context(|| format!("building {table}"))?;
    store
      .write(table, rows, table.partitioning())
      .await
      .with_context(|| format!("writing {table}"))?;
  }
  Ok(())
}

fn ensure_integrity(report: &IntegrityReport) -> Result<()> {
  if report.valid {
    return Ok(());
  }
  let orphans: Vec<String> = report
    .orphan_counts
    .iter()
    .map(|(column, count)| format!("{column}: {count}"))
    .collect();
  bail!("referential integrity violated ({})", orphans.join(", "))
}

// ─── validate ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StoreCheck {
  format:    &'static str,
  rows:      Vec<(TableName, usize)>,
  integrity: IntegrityReport,
}

pub async fn validate(config: &CliConfig, format: Format, json: bool) -> Result<()> {
  let check = match format {
    Format::Parquet => check_store(&ParquetStore::new(config.parquet_root()), format).await?,
    Format::Csv => check_store(&csv_store(config)?, format).await?,
    Format::Sqlite => {
      check_store(&open_sqlite(&config.sqlite_path(), false).await?, format).await?
    }
  };

  if json {
    println!("{}", to_json(&check)?);
  } else {
    let rows: Vec<Vec<Value>> = check
      .rows
      .iter()
      .map(|(t, n)| vec![t.as_str().into(), (*n as i64).into()])
      .collect();
    print!("{}", render_table(&header(&["table", "rows"]), &rows));
    println!(
      "referential integrity: {}",
      if check.integrity.valid { "ok" } else { "VIOLATED" }
    );
    for (column, samples) in &check.integrity.orphan_samples {
      println!("  {column}: orphan keys {samples:?}");
    }
  }
  ensure_integrity(&check.integrity)
}

/// Read every dimension back, recheck SCD history, then test each fact
/// foreign key against the stored dimension keys.
async fn check_store<S: TableStore>(store: &S, format: Format) -> Result<StoreCheck> {
  let mut dimensions = Vec::new();
  for table in TableName::ALL.into_iter().filter(|t| t.is_dimension()) {
    let rows = store
      .read(table, &ReadFilter::all())
      .await
      .with_context(|| format!("reading {table}"))?;
    ensure!(!rows.is_empty(), "{table} is empty or missing");
    dimensions.push((table, rows));
  }

  let products = dimensions
    .iter()
    .find(|(t, _)| *t == TableName::DimProduct)
    .map(|(_, rows)| rows.to_records::<DimProduct>())
    .ok_or_else(|| anyhow!("{} was not read", TableName::DimProduct))?
    .context("decoding products")?;
  validate_scd_type2(&products).context("checking product history")?;

  let keys = DimensionKeys::from_row_sets(dimensions.iter().map(|(t, rows)| (*t, rows)))?;
  let filter = ReadFilter::all().with_columns(ForeignKey::ALL.map(ForeignKey::column));
  let facts = store
    .read(TableName::FactSales, &filter)
    .await
    .with_context(|| format!("reading {}", TableName::FactSales))?;
  let integrity = check_referential_integrity_rows(&facts, &keys, &ForeignKey::ALL)?;

  let mut rows: Vec<_> = dimensions.iter().map(|(t, r)| (*t, r.len())).collect();
  rows.push((TableName::FactSales, facts.len()));
  Ok(StoreCheck { format: format.as_str(), rows, integrity })
}

// ─── query / analyze ─────────────────────────────────────────────────────────

fn print_result(result: &QueryResult, json: bool) -> Result<()> {
  if json {
    println!("{}", to_json(result)?);
  } else {
    print!("{}", render_table(&result.columns, &result.rows));
    println!("({} rows, {})", result.len(), format_elapsed(result.elapsed));
  }
  Ok(())
}

pub async fn query(config: &CliConfig, sql: &str, json: bool) -> Result<()> {
  let store = open_sqlite(&config.sqlite_path(), false).await?;
  let result = store.execute(sql).await.context("running query")?;
  print_result(&result, json)
}

pub async fn analyze(config: &CliConfig, pattern: &Pattern, show_sql: bool, json: bool) -> Result<()> {
  if show_sql {
    eprintln!("-- {}\n{}", pattern.name(), pattern.sql()?);
  }
  let store = open_sqlite(&config.sqlite_path(), false).await?;
  let result = olap_query::run(&store, pattern)
    .await
    .with_context(|| format!("running {}", pattern.name()))?;
  print_result(&result, json)
}

/// Parse `attribute=value`, typing the value by the attribute's column.
pub fn parse_filter(raw: &str) -> Result<Filter> {
  let (name, value) = raw
    .split_once('=')
    .ok_or_else(|| anyhow!("filter {raw:?} is not of the form attribute=value"))?;
  let attribute: Attribute = name.trim().parse()?;
  let value = attribute
    .table()
    .require_column_type(attribute.column())?
    .parse(attribute.column(), value.trim())?;
  Ok(Filter { attribute, value })
}

// ─── partitions ──────────────────────────────────────────────────────────────

pub async fn partitions(config: &CliConfig, format: Format, table: TableName, json: bool) -> Result<()> {
  let partitions = match format {
    Format::Parquet => ParquetStore::new(config.parquet_root()).partitions(table).await?,
    Format::Csv => csv_store(config)?.partitions(table).await?,
    Format::Sqlite => {
      open_sqlite(&config.sqlite_path(), false)
        .await?
        .partitions(table)
        .await?
    }
  };

  if json {
    println!("{}", to_json(&partitions)?);
    return Ok(());
  }
  if partitions.is_empty() {
    println!("{table} has no partitions in the {format} store");
    return Ok(());
  }
  let rows: Vec<Vec<Value>> = partitions
    .iter()
    .map(|p| {
      vec![
        p.key.to_string().into(),
        (p.row_count as i64).into(),
        format_bytes(p.size_bytes).into(),
      ]
    })
    .collect();
  print!("{}", render_table(&header(&["partition", "rows", "size"]), &rows));
  let total: u64 = partitions.iter().map(|p| p.row_count).sum();
  println!("({} partitions, {total} rows)", partitions.len());
  Ok(())
}

// ─── pruning ─────────────────────────────────────────────────────────────────

pub async fn pruning(
  config: &CliConfig,
  filter: &PartitionFilter,
  pruning: &PruningConfig,
  json: bool,
) -> Result<()> {
  let store = open_sqlite(&config.sqlite_path(), false).await?;
  let report = compare_pruning(&store, filter, pruning)
    .await
    .context("running pruning probe")?;

  if json {
    println!("{}", to_json(&report)?);
    return Ok(());
  }
  println!("filter:      {}", filter.to_sql_predicate().unwrap_or_default());
  println!("iterations:  {}", report.iterations);
  println!("full scan:   {:.2} ms ({} rows)", report.full_scan_ms, report.full_rows);
  println!("pruned scan: {:.2} ms ({} rows)", report.pruned_ms, report.pruned_rows);
  println!("speedup:     {:.2}x (saved {:.2} ms)", report.speedup, report.time_saved_ms);
  println!(
    "effective:   {} (threshold {:.2}x)",
    if report.effective { "yes" } else { "no" },
    report.threshold
  );
  Ok(())
}

// ─── benchmark ───────────────────────────────────────────────────────────────

/// Time whole-table reads of `table` from each of `formats`.
pub async fn run_benchmark(
  config: &CliConfig,
  formats: &[Format],
  table: TableName,
  bench: &BenchmarkConfig,
) -> Result<BenchmarkReport> {
  let mut results = Vec::with_capacity(formats.len());
  for &format in formats {
    let name = format.as_str();
    let result = match format {
      Format::Parquet => {
        benchmark_store(&ParquetStore::new(config.parquet_root()), name, table, bench).await
      }
      Format::Csv => benchmark_store(&csv_store(config)?, name, table, bench).await,
      Format::Sqlite => {
        let store = open_sqlite(&config.sqlite_path(), false).await?;
        benchmark_store(&store, name, table, bench).await
      }
    };
    results.push(result.with_context(|| format!("benchmarking the {format} store"))?);
    info!(%format, %table, "benchmark finished");
  }
  Ok(compare_formats(table, results))
}

pub async fn benchmark(
  config: &CliConfig,
  formats: &[Format],
  table: TableName,
  bench: &BenchmarkConfig,
  json: bool,
) -> Result<()> {
  let report = run_benchmark(config, formats, table, bench).await?;

  if json {
    println!("{}", to_json(&report)?);
    return Ok(());
  }
  let rows: Vec<Vec<Value>> = report
    .formats
    .iter()
    .map(|f| {
      vec![
        f.format.as_str().into(),
        (f.row_count as i64).into(),
        format_bytes(f.size_bytes).into(),
        f.compression_ratio.map_or(Value::Null, Value::Float),
        Value::Float(f.timings.mean_ms),
        Value::Float(f.timings.min_ms),
        Value::Float(f.timings.p50_ms),
        Value::Float(f.timings.p95_ms),
        Value::Float(f.timings.max_ms),
        f.speedup.map_or(Value::Null, Value::Float),
      ]
    })
    .collect();
  let columns = header(&[
    "format", "rows", "size", "ratio", "mean_ms", "min_ms", "p50_ms", "p95_ms", "max_ms",
    "speedup",
  ]);
  print!("{}", render_table(&columns, &rows));
  println!(
    "({table}, {} runs per format; fastest: {}, smallest: {})",
    bench.iterations,
    report.fastest.as_deref().unwrap_or("-"),
    report.smallest.as_deref().unwrap_or("-"),
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filters_are_typed_by_column() {
    let year = parse_filter("year=2023").unwrap();
    assert_eq!(year.attribute, Attribute::Year);
    assert_eq!(year.value, Value::Int(2023));

    let category = parse_filter("category = Home & Garden").unwrap();
    assert_eq!(category.attribute, Attribute::Category);
    assert_eq!(category.value, Value::from("Home & Garden"));
  }

  #[test]
  fn malformed_filters_are_rejected() {
    assert!(parse_filter("year").is_err());
    assert!(parse_filter("no_such_attribute=1").is_err());
    assert!(parse_filter("year=twenty").is_err());
  }

  #[test]
  fn all_expands_to_every_backend() {
    assert_eq!(OutputFormat::All.formats(), Format::ALL.to_vec());
    assert_eq!(OutputFormat::Csv.formats(), vec![Format::Csv]);
  }

  #[tokio::test]
  async fn generated_stores_validate() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = CliConfig { output_dir: dir.path().to_path_buf(), ..Default::default() };
    config.dataset.num_products = 20;
    config.dataset.num_customers = 50;
    config.dataset.num_transactions = 200;
    config.dataset.num_countries = 1;
    config.dataset.regions_per_country = 2;
    config.dataset.cities_per_region = 2;

    generate(&config, &Format::ALL, true).await.unwrap();
    for format in Format::ALL {
      validate(&config, format, true).await.unwrap();
    }
    partitions(&config, Format::Parquet, TableName::FactSales, false).await.unwrap();
    query(&config, "SELECT COUNT(*) AS n FROM fact_sales", false).await.unwrap();
  }

  #[tokio::test]
  async fn benchmark_compares_every_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = CliConfig { output_dir: dir.path().to_path_buf(), ..Default::default() };
    config.dataset.num_products = 20;
    config.dataset.num_customers = 50;
    config.dataset.num_transactions = 200;
    generate(&config, &Format::ALL, false).await.unwrap();

    let bench = BenchmarkConfig { iterations: 3, warmup: 0 };
    let report = run_benchmark(&config, &Format::ALL, TableName::FactSales, &bench)
      .await
      .unwrap();

    let names: Vec<&str> = report.formats.iter().map(|f| f.format.as_str()).collect();
    assert_eq!(names, ["parquet", "csv", "sqlite"]);
    let rows = report.formats[0].row_count;
    assert!(rows > 0);
    for f in &report.formats {
      assert_eq!(f.row_count, rows, "{}", f.format);
      assert!(f.size_bytes.is_some_and(|b| b > 0), "{}", f.format);
      assert!(f.compression_ratio.is_some_and(|r| r >= 1.0), "{}", f.format);
      assert_eq!(f.timings.runs, 3);
    }
    assert!(report.formats.iter().any(|f| f.compression_ratio == Some(1.0)));
    assert!(report.fastest.is_some() && report.smallest.is_some());

    benchmark(&config, &[Format::Csv], TableName::DimProduct, &bench, true).await.unwrap();
  }

  #[tokio::test]
  async fn query_without_a_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = CliConfig { output_dir: dir.path().to_path_buf(), ..Default::default() };
    assert!(query(&config, "SELECT 1", false).await.is_err());
  }
}
