//! Logical attributes and metrics, each resolved to a fixed table alias and
//! column. Queries never infer a table from a column name.

use std::{fmt, str::FromStr};

use olap_core::TableName;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Alias of the fact table in every generated query.
pub const FACT_ALIAS: &str = "fs";

/// The alias a table is joined under.
pub fn table_alias(table: TableName) -> &'static str {
  match table {
    TableName::DimTime => "dt",
    TableName::DimGeography => "dg",
    TableName::DimProduct => "dp",
    TableName::DimCustomer => "dc",
    TableName::DimPayment => "dpm",
    TableName::FactSales => FACT_ALIAS,
  }
}

/// `JOIN <dim> <alias> ON fs.<key> = <alias>.<key>`; the fact table's
/// foreign keys share their names with the dimension surrogate keys.
pub fn join_clause(dimension: TableName) -> String {
  let alias = table_alias(dimension);
  let key = dimension.primary_key();
  format!("JOIN {dimension} {alias} ON {FACT_ALIAS}.{key} = {alias}.{key}")
}

// ─── Attribute ───────────────────────────────────────────────────────────────

/// A dimension attribute that queries can group or filter by.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
  Year,
  Quarter,
  Month,
  MonthName,
  Date,
  DayName,
  FiscalYear,
  Country,
  Region,
  City,
  Category,
  Subcategory,
  Brand,
  ProductName,
  CustomerSegment,
  IncomeSegment,
  PaymentMethod,
  PaymentType,
}

impl Attribute {
  pub const ALL: [Attribute; 18] = [
    Self::Year,
    Self::Quarter,
    Self::Month,
    Self::MonthName,
    Self::Date,
    Self::DayName,
    Self::FiscalYear,
    Self::Country,
    Self::Region,
    Self::City,
    Self::Category,
    Self::Subcategory,
    Self::Brand,
    Self::ProductName,
    Self::CustomerSegment,
    Self::IncomeSegment,
    Self::PaymentMethod,
    Self::PaymentType,
  ];

  pub fn table(self) -> TableName {
    match self {
      Self::Year
      | Self::Quarter
      | Self::Month
      | Self::MonthName
      | Self::Date
      | Self::DayName
      | Self::FiscalYear => TableName::DimTime,
      Self::Country | Self::Region | Self::City => TableName::DimGeography,
      Self::Category | Self::Subcategory | Self::Brand | Self::ProductName => {
        TableName::DimProduct
      }
      Self::CustomerSegment | Self::IncomeSegment => TableName::DimCustomer,
      Self::PaymentMethod | Self::PaymentType => TableName::DimPayment,
    }
  }

  /// Column name within [`Self::table`]; also the attribute's name.
  pub fn column(self) -> &'static str {
    match self {
      Self::Year => "year",
      Self::Quarter => "quarter",
      Self::Month => "month",
      Self::MonthName => "month_name",
      Self::Date => "date",
      Self::DayName => "day_name",
      Self::FiscalYear => "fiscal_year",
      Self::Country => "country",
      Self::Region => "region",
      Self::City => "city",
      Self::Category => "category",
      Self::Subcategory => "subcategory",
      Self::Brand => "brand",
      Self::ProductName => "product_name",
      Self::CustomerSegment => "customer_segment",
      Self::IncomeSegment => "income_segment",
      Self::PaymentMethod => "payment_method",
      Self::PaymentType => "payment_type",
    }
  }

  pub fn alias(self) -> &'static str { table_alias(self.table()) }

  /// `alias.column`.
  pub fn qualified(self) -> String {
    format!("{}.{}", self.alias(), self.column())
  }
}

impl fmt::Display for Attribute {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.column())
  }
}

impl FromStr for Attribute {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|a| a.column() == s)
      .ok_or_else(|| Error::UnknownAttribute(s.to_owned()))
  }
}

// ─── Metric ──────────────────────────────────────────────────────────────────

/// An additive fact measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
  Revenue,
  Profit,
  Cost,
  Quantity,
  DiscountAmount,
}

impl Metric {
  pub const ALL: [Metric; 5] = [
    Self::Revenue,
    Self::Profit,
    Self::Cost,
    Self::Quantity,
    Self::DiscountAmount,
  ];

  pub fn column(self) -> &'static str {
    match self {
      Self::Revenue => "revenue",
      Self::Profit => "profit",
      Self::Cost => "cost",
      Self::Quantity => "quantity",
      Self::DiscountAmount => "discount_amount",
    }
  }

  pub fn qualified(self) -> String { format!("{FACT_ALIAS}.{}", self.column()) }
}

impl fmt::Display for Metric {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.column())
  }
}

impl FromStr for Metric {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|m| m.column() == s)
      .ok_or_else(|| Error::UnknownMetric(s.to_owned()))
  }
}
