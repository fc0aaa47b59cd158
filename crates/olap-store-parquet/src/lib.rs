//! Columnar Parquet backend for the star schema.
//!
//! Each table maps to an Arrow schema derived from its column types and is
//! written Snappy-compressed, one file per partition directory. Row and
//! column counts come from Parquet footers, so metadata never scans data.

mod columnar;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::ParquetStore;

#[cfg(test)]
mod tests;
