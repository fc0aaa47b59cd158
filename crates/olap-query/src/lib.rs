//! OLAP query patterns, the partition-pruning probe and the storage-format
//! benchmark.
//!
//! Everything here renders SQL against the star schema's table names and
//! runs it on any [`olap_core::query::QueryEngine`]. Dimension attributes map
//! to table aliases through [`Attribute`], never by guessing from a column
//! name.

pub mod attribute;
pub mod benchmark;
pub mod error;
pub mod patterns;
pub mod pruning;
pub mod sql;

pub use attribute::{Attribute, Metric};
pub use benchmark::{
  BenchmarkConfig, BenchmarkReport, FormatBenchmark, TimingStats, benchmark_query, benchmark_store,
  compare_formats,
};
pub use error::{Error, Result};
pub use patterns::{DrillLevel, Pattern, run};
pub use pruning::{PruningConfig, PruningReport, compare_pruning};
pub use sql::Filter;
