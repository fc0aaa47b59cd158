//! `olap`: generate a synthetic star-schema dataset, store it as Parquet,
//! CSV or SQLite, and run analytical queries against it.
//!
//! # Usage
//!
//! ```text
//! olap generate --format all --output-dir data --transactions 50000
//! olap validate --format parquet
//! olap query "SELECT COUNT(*) FROM fact_sales"
//! olap analyze revenue --by year --by category --filter country=USA
//! olap partitions --format csv
//! olap pruning --year 2023 --quarter Q1
//! olap benchmark --table fact_sales --iterations 5
//! ```

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use commands::{Format, OutputFormat, parse_filter};
use config::CliConfig;
use olap_core::{PartitionFilter, Quarter, TableName};
use olap_query::{
  Attribute, BenchmarkConfig, Filter, Metric, Pattern, PruningConfig,
  benchmark::{DEFAULT_BENCHMARK_ITERATIONS, DEFAULT_WARMUP},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "olap", author, version, about = "Synthetic star-schema OLAP workbench")]
struct Cli {
  /// Path to a TOML config file. `OLAP_*` environment variables apply on top.
  #[arg(short, long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Root directory of the stores (overrides `output_dir`).
  #[arg(short, long, global = true, value_name = "DIR")]
  output_dir: Option<PathBuf>,

  /// Print machine-readable JSON instead of tables.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Generate the dataset and write it to one or more stores.
  Generate(GenerateArgs),

  /// Re-read a store and recheck product history and referential integrity.
  Validate {
    #[arg(short, long, value_enum, default_value_t = Format::Parquet)]
    format: Format,
  },

  /// Run SQL against the SQLite store.
  Query { sql: String },

  /// Run a named query pattern against the SQLite store.
  Analyze(AnalyzeArgs),

  /// List the partitions of a table with row counts and sizes.
  Partitions {
    #[arg(short, long, value_enum, default_value_t = Format::Parquet)]
    format: Format,
    #[arg(short, long, default_value_t = TableName::FactSales)]
    table:  TableName,
  },

  /// Time a partition-filtered scan against a full scan.
  Pruning {
    #[arg(long)]
    year:       i32,
    #[arg(long)]
    quarter:    Option<Quarter>,
    #[arg(long)]
    iterations: Option<usize>,
    /// Speedup at which pruning counts as effective.
    #[arg(long)]
    threshold:  Option<f64>,
  },

  /// Compare read latency and on-disk size of a table across stores.
  Benchmark {
    /// Store to include; repeatable. Defaults to every store.
    #[arg(short, long = "format", value_enum)]
    formats:    Vec<Format>,
    #[arg(short, long, default_value_t = TableName::FactSales)]
    table:      TableName,
    #[arg(long, default_value_t = DEFAULT_BENCHMARK_ITERATIONS)]
    iterations: usize,
    /// Untimed reads before the timed ones.
    #[arg(long, default_value_t = DEFAULT_WARMUP)]
    warmup:     usize,
  },
}

#[derive(Args, Debug)]
struct GenerateArgs {
  #[arg(short, long, value_enum, default_value_t = OutputFormat::All)]
  format:       OutputFormat,
  /// Skip integrity checks before writing.
  #[arg(long)]
  no_validate:  bool,
  #[arg(long)]
  seed:         Option<u64>,
  #[arg(long)]
  start_date:   Option<NaiveDate>,
  #[arg(long)]
  end_date:     Option<NaiveDate>,
  #[arg(long)]
  products:     Option<usize>,
  #[arg(long)]
  customers:    Option<usize>,
  #[arg(long)]
  transactions: Option<usize>,
  /// Field delimiter of the CSV store.
  #[arg(long)]
  delimiter:    Option<char>,
}

impl GenerateArgs {
  fn apply(&self, config: &mut CliConfig) {
    let dataset = &mut config.dataset;
    if let Some(seed) = self.seed {
      dataset.seed = seed;
    }
    if let Some(date) = self.start_date {
      dataset.start_date = date;
    }
    if let Some(date) = self.end_date {
      dataset.end_date = date;
    }
    if let Some(n) = self.products {
      dataset.num_products = n;
    }
    if let Some(n) = self.customers {
      dataset.num_customers = n;
    }
    if let Some(n) = self.transactions {
      dataset.num_transactions = n;
    }
    if let Some(d) = self.delimiter {
      config.csv_delimiter = d;
    }
  }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
  /// Print the generated SQL to stderr first.
  #[arg(long)]
  show_sql: bool,

  #[command(subcommand)]
  pattern: PatternCommand,
}

#[derive(Subcommand, Debug)]
enum PatternCommand {
  /// Revenue, profit and quantity grouped by dimension attributes.
  Revenue {
    #[arg(long = "by", required = true)]
    dimensions: Vec<Attribute>,
    /// `attribute=value` equality filter; repeatable.
    #[arg(long = "filter", value_parser = parse_filter_arg)]
    filters:    Vec<Filter>,
    #[arg(long)]
    limit:      Option<usize>,
  },
  /// Break a year into quarters, a quarter into months or a month into days.
  DrillDown {
    #[arg(long)]
    year:    i32,
    #[arg(long)]
    quarter: Option<Quarter>,
    #[arg(long)]
    month:   Option<u32>,
  },
  /// Monthly revenue with a trailing moving average.
  MovingAverage {
    #[arg(long, default_value_t = 3)]
    window: usize,
    #[arg(long)]
    year:   Option<i32>,
  },
  /// Year-over-year growth of a metric.
  Yoy {
    #[arg(long, default_value = "revenue")]
    metric:    Metric,
    #[arg(long)]
    dimension: Option<Attribute>,
  },
  /// Top products by a metric within each group.
  Rankings {
    #[arg(long = "by", default_value = "category")]
    partition_by: Attribute,
    #[arg(long, default_value = "revenue")]
    metric:       Metric,
    #[arg(long)]
    year:         Option<i32>,
    #[arg(long, default_value_t = 10)]
    top:          usize,
  },
  /// Total revenue of the fact rows in the given partitions.
  PartitionScan {
    #[arg(long)]
    year:    Option<i32>,
    #[arg(long)]
    quarter: Option<Quarter>,
  },
}

fn parse_filter_arg(raw: &str) -> Result<Filter, String> {
  parse_filter(raw).map_err(|e| format!("{e:#}"))
}

impl PatternCommand {
  fn into_pattern(self) -> Pattern {
    match self {
      Self::Revenue { dimensions, filters, limit } => {
        Pattern::RevenueByDimensions { dimensions, filters, limit }
      }
      Self::DrillDown { year, quarter, month } => Pattern::DrillDownTime { year, quarter, month },
      Self::MovingAverage { window, year } => Pattern::MovingAverageRevenue { window, year },
      Self::Yoy { metric, dimension } => Pattern::YoyGrowth { metric, dimension },
      Self::Rankings { partition_by, metric, year, top } => Pattern::ProductRankings {
        partition_by,
        metric,
        year,
        top_n: top,
      },
      Self::PartitionScan { year, quarter } => Pattern::PartitionScan {
        filter: PartitionFilter { year, quarter },
      },
    }
  }
}

/// Configured pruning settings with any flags applied on top.
fn pruning_overrides(
  config: &CliConfig,
  threshold: Option<f64>,
  iterations: Option<usize>,
) -> PruningConfig {
  let mut pruning = config.pruning();
  if let Some(threshold) = threshold {
    pruning.threshold = threshold;
  }
  if let Some(iterations) = iterations {
    pruning.iterations = iterations;
  }
  pruning
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // Flags override the environment, which overrides the config file.
  let mut config = CliConfig::load(cli.config.as_deref()).context("loading configuration")?;
  if let Some(dir) = cli.output_dir {
    config.output_dir = dir;
  }

  match cli.command {
    Command::Generate(args) => {
      args.apply(&mut config);
      commands::generate(&config, &args.format.formats(), !args.no_validate).await
    }
    Command::Validate { format } => commands::validate(&config, format, cli.json).await,
    Command::Query { sql } => commands::query(&config, &sql, cli.json).await,
    Command::Analyze(args) => {
      let pattern = args.pattern.into_pattern();
      commands::analyze(&config, &pattern, args.show_sql, cli.json).await
    }
    Command::Partitions { format, table } => {
      commands::partitions(&config, format, table, cli.json).await
    }
    Command::Pruning { year, quarter, iterations, threshold } => {
      let pruning = pruning_overrides(&config, threshold, iterations);
      let filter = PartitionFilter { year: Some(year), quarter };
      commands::pruning(&config, &filter, &pruning, cli.json).await
    }
    Command::Benchmark { formats, table, iterations, warmup } => {
      let formats = if formats.is_empty() { Format::ALL.to_vec() } else { formats };
      let bench = BenchmarkConfig { iterations, warmup };
      commands::benchmark(&config, &formats, table, &bench, cli.json).await
    }
  }
}
