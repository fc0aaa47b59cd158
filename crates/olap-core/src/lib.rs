//! Core types and trait definitions for the star-schema OLAP workbench.
//!
//! This crate is deliberately free of database and file-format dependencies.
//! Generators, stores and the query layer all depend on it.

pub mod dimension;
pub mod error;
pub mod fact;
pub mod layout;
pub mod partition;
pub mod query;
pub mod store;
pub mod table;
pub mod validate;
pub mod value;

pub use error::{Error, Result};
pub use partition::{PartitionFilter, PartitionKey, Quarter};
pub use table::{Partitioning, TableName};
pub use value::{Record, RowSet, Value};
