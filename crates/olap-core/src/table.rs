//! The six tables of the star schema and their physical properties.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error,
  dimension::{
    DIM_CUSTOMER_COLUMNS, DIM_GEOGRAPHY_COLUMNS, DIM_PAYMENT_COLUMNS,
    DIM_PRODUCT_COLUMNS, DIM_TIME_COLUMNS,
  },
  fact::SALES_FACT_COLUMNS,
  partition::PARTITION_COLUMNS,
  value::{Column, ColumnType},
};

/// How a table is laid out across partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partitioning {
  /// A single file / unsplit table.
  None,
  /// Hive-style `year=<yyyy>/quarter=<Qn>` partitions.
  YearQuarter,
}

impl Partitioning {
  /// Column names the rows must carry for this scheme.
  pub fn columns(self) -> &'static [Column] {
    match self {
      Self::None => &[],
      Self::YearQuarter => PARTITION_COLUMNS,
    }
  }
}

/// A table of the star schema.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
  DimTime,
  DimGeography,
  DimProduct,
  DimCustomer,
  DimPayment,
  FactSales,
}

impl TableName {
  /// Dimensions first, in the order they must be loaded.
  pub const ALL: [TableName; 6] = [
    Self::DimTime,
    Self::DimGeography,
    Self::DimProduct,
    Self::DimCustomer,
    Self::DimPayment,
    Self::FactSales,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::DimTime => "dim_time",
      Self::DimGeography => "dim_geography",
      Self::DimProduct => "dim_product",
      Self::DimCustomer => "dim_customer",
      Self::DimPayment => "dim_payment",
      Self::FactSales => "fact_sales",
    }
  }

  /// Stored columns, excluding partition columns.
  pub fn schema(self) -> &'static [Column] {
    match self {
      Self::DimTime => DIM_TIME_COLUMNS,
      Self::DimGeography => DIM_GEOGRAPHY_COLUMNS,
      Self::DimProduct => DIM_PRODUCT_COLUMNS,
      Self::DimCustomer => DIM_CUSTOMER_COLUMNS,
      Self::DimPayment => DIM_PAYMENT_COLUMNS,
      Self::FactSales => SALES_FACT_COLUMNS,
    }
  }

  pub fn column_names(self) -> Vec<String> {
    self.schema().iter().map(|c| c.name.to_owned()).collect()
  }

  /// The surrogate key column; for the fact table, the first component of
  /// its composite identity.
  pub fn primary_key(self) -> &'static str {
    match self {
      Self::DimTime => "time_key",
      Self::DimGeography => "geo_key",
      Self::DimProduct => "product_key",
      Self::DimCustomer => "customer_key",
      Self::DimPayment => "payment_key",
      Self::FactSales => "transaction_id",
    }
  }

  /// Default physical layout: only the fact table is partitioned.
  pub fn partitioning(self) -> Partitioning {
    match self {
      Self::FactSales => Partitioning::YearQuarter,
      _ => Partitioning::None,
    }
  }

  pub fn is_dimension(self) -> bool { self != Self::FactSales }

  /// Type of a stored or partition column.
  pub fn column_type(self, name: &str) -> Option<ColumnType> {
    self
      .schema()
      .iter()
      .chain(self.partitioning().columns())
      .find(|c| c.name == name)
      .map(|c| c.ty)
  }

  /// Like [`Self::column_type`] but reporting unknown columns as an error.
  pub fn require_column_type(self, name: &str) -> Result<ColumnType, Error> {
    self.column_type(name).ok_or_else(|| Error::UnknownColumn {
      table:  self,
      column: name.to_owned(),
    })
  }
}

impl fmt::Display for TableName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TableName {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|t| t.as_str() == s)
      .ok_or_else(|| Error::InvalidParameter(format!("unknown table {s:?}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_parse_back() {
    for table in TableName::ALL {
      assert_eq!(table.as_str().parse::<TableName>().unwrap(), table);
    }
    assert!("dim_store".parse::<TableName>().is_err());
  }

  #[test]
  fn only_the_fact_table_is_partitioned() {
    for table in TableName::ALL {
      assert_eq!(
        table.partitioning() == Partitioning::YearQuarter,
        table == TableName::FactSales
      );
    }
  }

  #[test]
  fn partition_columns_resolve_only_on_partitioned_tables() {
    assert_eq!(
      TableName::FactSales.column_type("quarter"),
      Some(ColumnType::Text)
    );
    assert_eq!(TableName::FactSales.column_type("year"), Some(ColumnType::Int));
    // Calendar attribute, not a partition column.
    assert_eq!(TableName::DimTime.column_type("year"), Some(ColumnType::Int));
    assert_eq!(TableName::DimPayment.column_type("quarter"), None);
  }

  #[test]
  fn primary_keys_are_schema_columns() {
    for table in TableName::ALL {
      assert!(table.column_type(table.primary_key()).is_some());
    }
  }
}
