//! The sales fact row and the derivation of its measures.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  partition::PartitionKey,
  table::TableName,
  value::{Column, ColumnType, Record, RowView, Value},
};

use ColumnType::{Date, Float, Int, Timestamp};

/// Round half away from zero to two decimal places.
pub fn round2(v: f64) -> f64 { (v * 100.0).round() / 100.0 }

// ─── Measures ────────────────────────────────────────────────────────────────

/// The derived monetary measures of one line item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measures {
  pub revenue:         f64,
  pub cost:            f64,
  pub discount_amount: f64,
  pub profit:          f64,
}

impl Measures {
  /// Derive revenue and profit from a line's quantity, price, total cost and
  /// discount. `cost` is the already-rounded line cost.
  pub fn derive(
    quantity: i32,
    unit_price: f64,
    cost: f64,
    discount_amount: f64,
  ) -> Self {
    let gross = Self::gross(quantity, unit_price);
    let revenue = round2(gross - discount_amount);
    Self {
      revenue,
      cost,
      discount_amount,
      profit: round2(revenue - cost),
    }
  }

  /// Revenue before discount.
  pub fn gross(quantity: i32, unit_price: f64) -> f64 {
    round2(f64::from(quantity) * unit_price)
  }

  /// Line cost for `quantity` units.
  pub fn line_cost(quantity: i32, unit_cost: f64) -> f64 {
    round2(f64::from(quantity) * unit_cost)
  }
}

// ─── SalesFact ───────────────────────────────────────────────────────────────

pub const SALES_FACT_COLUMNS: &[Column] = &[
  Column::new("transaction_id", Int),
  Column::new("line_item_id", Int),
  Column::new("transaction_date", Date),
  Column::new("transaction_timestamp", Timestamp),
  Column::new("time_key", Int),
  Column::new("geo_key", Int),
  Column::new("product_key", Int),
  Column::new("customer_key", Int),
  Column::new("payment_key", Int),
  Column::new("quantity", Int),
  Column::new("unit_price", Float),
  Column::new("revenue", Float),
  Column::new("cost", Float),
  Column::new("discount_amount", Float),
  Column::new("profit", Float),
];

/// The column fact rows are partitioned by.
pub const SALES_DATE_COLUMN: &str = "transaction_date";

/// One line item of a sales transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesFact {
  pub transaction_id:        i64,
  pub line_item_id:          i32,
  pub transaction_date:      NaiveDate,
  pub transaction_timestamp: NaiveDateTime,
  pub time_key:              i64,
  pub geo_key:               i64,
  pub product_key:           i64,
  pub customer_key:          i64,
  pub payment_key:           i64,
  pub quantity:              i32,
  pub unit_price:            f64,
  pub revenue:               f64,
  pub cost:                  f64,
  pub discount_amount:       f64,
  pub profit:                f64,
}

impl SalesFact {
  pub fn partition_key(&self) -> PartitionKey {
    PartitionKey::from_date(self.transaction_date)
  }

  pub fn measures(&self) -> Measures {
    Measures {
      revenue:         self.revenue,
      cost:            self.cost,
      discount_amount: self.discount_amount,
      profit:          self.profit,
    }
  }
}

impl Record for SalesFact {
  const TABLE: TableName = TableName::FactSales;

  fn to_row(&self) -> Vec<Value> {
    vec![
      self.transaction_id.into(),
      self.line_item_id.into(),
      self.transaction_date.into(),
      self.transaction_timestamp.into(),
      self.time_key.into(),
      self.geo_key.into(),
      self.product_key.into(),
      self.customer_key.into(),
      self.payment_key.into(),
      self.quantity.into(),
      self.unit_price.into(),
      self.revenue.into(),
      self.cost.into(),
      self.discount_amount.into(),
      self.profit.into(),
    ]
  }

  fn from_row(row: &RowView<'_>) -> Result<Self> {
    Ok(Self {
      transaction_id:        row.int("transaction_id")?,
      line_item_id:          row.int32("line_item_id")?,
      transaction_date:      row.date("transaction_date")?,
      transaction_timestamp: row.timestamp("transaction_timestamp")?,
      time_key:              row.int("time_key")?,
      geo_key:               row.int("geo_key")?,
      product_key:           row.int("product_key")?,
      customer_key:          row.int("customer_key")?,
      payment_key:           row.int("payment_key")?,
      quantity:              row.int32("quantity")?,
      unit_price:            row.float("unit_price")?,
      revenue:               row.float("revenue")?,
      cost:                  row.float("cost")?,
      discount_amount:       row.float("discount_amount")?,
      profit:                row.float("profit")?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::partition::Quarter;

  #[test]
  fn five_units_at_ten_with_thirty_cost() {
    let m = Measures::derive(5, 10.00, 30.00, 0.0);
    assert_eq!(m.revenue, 50.00);
    assert_eq!(m.profit, 20.00);
  }

  #[test]
  fn discount_reduces_revenue_and_profit() {
    let m = Measures::derive(3, 19.99, Measures::line_cost(3, 8.5), 6.0);
    assert_eq!(Measures::gross(3, 19.99), 59.97);
    assert_eq!(m.revenue, 53.97);
    assert_eq!(m.cost, 25.5);
    assert_eq!(m.profit, 28.47);
  }

  #[test]
  fn round2_rounds_to_cents() {
    assert_eq!(round2(1.234), 1.23);
    assert_eq!(round2(1.236), 1.24);
    assert_eq!(round2(-2.5), -2.5);
  }

  #[test]
  fn fact_knows_its_partition() {
    let date = NaiveDate::from_ymd_opt(2023, 5, 17).unwrap();
    let fact = SalesFact {
      transaction_id:        1,
      line_item_id:          1,
      transaction_date:      date,
      transaction_timestamp: date.and_hms_opt(10, 0, 0).unwrap(),
      time_key:              20230517,
      geo_key:               1,
      product_key:           1,
      customer_key:          1,
      payment_key:           1,
      quantity:              1,
      unit_price:            1.0,
      revenue:               1.0,
      cost:                  0.5,
      discount_amount:       0.0,
      profit:                0.5,
    };
    assert_eq!(fact.partition_key(), PartitionKey::new(2023, Quarter::Q2));
    assert_eq!(fact.to_row().len(), SALES_FACT_COLUMNS.len());
  }
}
