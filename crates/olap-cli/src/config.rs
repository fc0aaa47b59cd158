//! Layered CLI configuration: defaults, an optional TOML file, then
//! `OLAP_`-prefixed environment variables. Command-line flags are applied on
//! top by the subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow};
use olap_datagen::DatasetConfig;
use olap_query::{
  PruningConfig,
  pruning::{DEFAULT_ITERATIONS, DEFAULT_THRESHOLD},
};
use serde::Deserialize;

/// File name of the SQLite database under the output directory.
pub const SQLITE_FILE: &str = "olap.db";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
  pub dataset:            DatasetConfig,
  /// Root under which `parquet/`, `csv/` and the SQLite file are written.
  pub output_dir:         PathBuf,
  pub csv_delimiter:      char,
  pub pruning_threshold:  f64,
  pub pruning_iterations: usize,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      dataset:            DatasetConfig::default(),
      output_dir:         PathBuf::from("data"),
      csv_delimiter:      ',',
      pruning_threshold:  DEFAULT_THRESHOLD,
      pruning_iterations: DEFAULT_ITERATIONS,
    }
  }
}

impl CliConfig {
  /// Load from `path` (which must exist when given) and the environment.
  ///
  /// Nested keys use a double underscore: `OLAP_DATASET__SEED=7`,
  /// `OLAP_OUTPUT_DIR=/tmp/olap`.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path).required(true));
    }
    builder
      .add_source(
        config::Environment::with_prefix("OLAP")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("building configuration")?
      .try_deserialize()
      .context("deserialising configuration")
  }

  pub fn parquet_root(&self) -> PathBuf { self.output_dir.join("parquet") }

  pub fn csv_root(&self) -> PathBuf { self.output_dir.join("csv") }

  pub fn sqlite_path(&self) -> PathBuf { self.output_dir.join(SQLITE_FILE) }

  /// The CSV delimiter as the single byte the `csv` crate expects.
  pub fn delimiter(&self) -> Result<u8> {
    u8::try_from(self.csv_delimiter)
      .ok()
      .filter(u8::is_ascii)
      .ok_or_else(|| anyhow!("CSV delimiter {:?} is not an ASCII character", self.csv_delimiter))
  }

  pub fn pruning(&self) -> PruningConfig {
    PruningConfig {
      threshold:  self.pruning_threshold,
      iterations: self.pruning_iterations,
    }
  }
}
