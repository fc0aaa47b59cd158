//! Row-oriented CSV backend for the star schema.
//!
//! Tables are laid out as described in [`olap_core::layout`]: one file per
//! unpartitioned table, one file per `year=/quarter=` directory otherwise.
//! File I/O runs on tokio's blocking pool.

mod file;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::CsvStore;
