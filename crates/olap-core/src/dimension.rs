//! Dimension rows of the star schema.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  partition::Quarter,
  table::TableName,
  value::{Column, ColumnType, Record, RowView, Value},
};

use ColumnType::{Bool, Date, Float, Int, Text};

/// `yyyymmdd` as an integer; the time dimension's surrogate key.
pub fn time_key_for(date: NaiveDate) -> i64 {
  i64::from(date.year()) * 10_000
    + i64::from(date.month()) * 100
    + i64::from(date.day())
}

/// Expiration date of current SCD type 2 rows.
pub const FAR_FUTURE: NaiveDate = match NaiveDate::from_ymd_opt(9999, 12, 31) {
  Some(d) => d,
  None => NaiveDate::MAX,
};

pub fn far_future() -> NaiveDate { FAR_FUTURE }

// ─── Time ────────────────────────────────────────────────────────────────────

pub const DIM_TIME_COLUMNS: &[Column] = &[
  Column::new("time_key", Int),
  Column::new("date", Date),
  Column::new("year", Int),
  Column::new("quarter", Text),
  Column::new("month", Int),
  Column::new("month_name", Text),
  Column::new("week", Int),
  Column::new("day_of_month", Int),
  Column::new("day_of_week", Int),
  Column::new("day_name", Text),
  Column::new("is_weekend", Bool),
  Column::new("is_holiday", Bool),
  Column::new("fiscal_year", Int),
  Column::new("fiscal_quarter", Text),
  Column::new("fiscal_period", Text),
];

/// One calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimTime {
  pub time_key:       i64,
  pub date:           NaiveDate,
  pub year:           i32,
  pub quarter:        Quarter,
  pub month:          u32,
  pub month_name:     String,
  /// ISO week number.
  pub week:           u32,
  pub day_of_month:   u32,
  /// 1 = Monday through 7 = Sunday.
  pub day_of_week:    u32,
  pub day_name:       String,
  pub is_weekend:     bool,
  pub is_holiday:     bool,
  pub fiscal_year:    i32,
  pub fiscal_quarter: String,
  pub fiscal_period:  String,
}

impl Record for DimTime {
  const TABLE: TableName = TableName::DimTime;

  fn to_row(&self) -> Vec<Value> {
    vec![
      self.time_key.into(),
      self.date.into(),
      self.year.into(),
      self.quarter.as_str().into(),
      self.month.into(),
      self.month_name.as_str().into(),
      self.week.into(),
      self.day_of_month.into(),
      self.day_of_week.into(),
      self.day_name.as_str().into(),
      self.is_weekend.into(),
      self.is_holiday.into(),
      self.fiscal_year.into(),
      self.fiscal_quarter.as_str().into(),
      self.fiscal_period.as_str().into(),
    ]
  }

  fn from_row(row: &RowView<'_>) -> Result<Self> {
    Ok(Self {
      time_key:       row.int("time_key")?,
      date:           row.date("date")?,
      year:           row.int32("year")?,
      quarter:        row.text("quarter")?.parse()?,
      month:          unsigned(row, "month")?,
      month_name:     row.text("month_name")?,
      week:           unsigned(row, "week")?,
      day_of_month:   unsigned(row, "day_of_month")?,
      day_of_week:    unsigned(row, "day_of_week")?,
      day_name:       row.text("day_name")?,
      is_weekend:     row.bool("is_weekend")?,
      is_holiday:     row.bool("is_holiday")?,
      fiscal_year:    row.int32("fiscal_year")?,
      fiscal_quarter: row.text("fiscal_quarter")?,
      fiscal_period:  row.text("fiscal_period")?,
    })
  }
}

// ─── Geography ───────────────────────────────────────────────────────────────

pub const DIM_GEOGRAPHY_COLUMNS: &[Column] = &[
  Column::new("geo_key", Int),
  Column::new("city", Text),
  Column::new("region", Text),
  Column::new("country", Text),
  Column::new("country_code", Text),
  Column::new("latitude", Float),
  Column::new("longitude", Float),
  Column::new("population_segment", Text),
  Column::new("timezone", Text),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimGeography {
  pub geo_key:            i64,
  pub city:               String,
  pub region:             String,
  pub country:            String,
  pub country_code:       String,
  pub latitude:           f64,
  pub longitude:          f64,
  pub population_segment: String,
  pub timezone:           String,
}

impl Record for DimGeography {
  const TABLE: TableName = TableName::DimGeography;

  fn to_row(&self) -> Vec<Value> {
    vec![
      self.geo_key.into(),
      self.city.as_str().into(),
      self.region.as_str().into(),
      self.country.as_str().into(),
      self.country_code.as_str().into(),
      self.latitude.into(),
      self.longitude.into(),
      self.population_segment.as_str().into(),
      self.timezone.as_str().into(),
    ]
  }

  fn from_row(row: &RowView<'_>) -> Result<Self> {
    Ok(Self {
      geo_key:            row.int("geo_key")?,
      city:               row.text("city")?,
      region:             row.text("region")?,
      country:            row.text("country")?,
      country_code:       row.text("country_code")?,
      latitude:           row.float("latitude")?,
      longitude:          row.float("longitude")?,
      population_segment: row.text("population_segment")?,
      timezone:           row.text("timezone")?,
    })
  }
}

// ─── Product ─────────────────────────────────────────────────────────────────

pub const DIM_PRODUCT_COLUMNS: &[Column] = &[
  Column::new("product_key", Int),
  Column::new("product_id", Text),
  Column::new("product_name", Text),
  Column::new("category", Text),
  Column::new("subcategory", Text),
  Column::new("brand", Text),
  Column::new("unit_cost", Float),
  Column::new("unit_price", Float),
  Column::new("effective_date", Date),
  Column::new("expiration_date", Date),
  Column::new("is_current", Bool),
];

/// A product version. Several rows may share a `product_id`; exactly one of
/// them is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimProduct {
  pub product_key:     i64,
  pub product_id:      String,
  pub product_name:    String,
  pub category:        String,
  pub subcategory:     String,
  pub brand:           String,
  pub unit_cost:       f64,
  pub unit_price:      f64,
  pub effective_date:  NaiveDate,
  pub expiration_date: NaiveDate,
  pub is_current:      bool,
}

impl Record for DimProduct {
  const TABLE: TableName = TableName::DimProduct;

  fn to_row(&self) -> Vec<Value> {
    vec![
      self.product_key.into(),
      self.product_id.as_str().into(),
      self.product_name.as_str().into(),
      self.category.as_str().into(),
      self.subcategory.as_str().into(),
      self.brand.as_str().into(),
      self.unit_cost.into(),
      self.unit_price.into(),
      self.effective_date.into(),
      self.expiration_date.into(),
      self.is_current.into(),
    ]
  }

  fn from_row(row: &RowView<'_>) -> Result<Self> {
    Ok(Self {
      product_key:     row.int("product_key")?,
      product_id:      row.text("product_id")?,
      product_name:    row.text("product_name")?,
      category:        row.text("category")?,
      subcategory:     row.text("subcategory")?,
      brand:           row.text("brand")?,
      unit_cost:       row.float("unit_cost")?,
      unit_price:      row.float("unit_price")?,
      effective_date:  row.date("effective_date")?,
      expiration_date: row.date("expiration_date")?,
      is_current:      row.bool("is_current")?,
    })
  }
}

// ─── Customer ────────────────────────────────────────────────────────────────

pub const DIM_CUSTOMER_COLUMNS: &[Column] = &[
  Column::new("customer_key", Int),
  Column::new("customer_id", Text),
  Column::new("first_name", Text),
  Column::new("last_name", Text),
  Column::new("email", Text),
  Column::new("phone", Text),
  Column::new("date_of_birth", Date),
  Column::new("gender", Text),
  Column::new("income_segment", Text),
  Column::new("customer_segment", Text),
  Column::new("registration_date", Date),
  Column::new("is_active", Bool),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimCustomer {
  pub customer_key:      i64,
  pub customer_id:       String,
  pub first_name:        String,
  pub last_name:         String,
  pub email:             String,
  pub phone:             String,
  pub date_of_birth:     NaiveDate,
  pub gender:            String,
  pub income_segment:    String,
  /// Loyalty tier, Bronze through Platinum.
  pub customer_segment:  String,
  pub registration_date: NaiveDate,
  pub is_active:         bool,
}

impl Record for DimCustomer {
  const TABLE: TableName = TableName::DimCustomer;

  fn to_row(&self) -> Vec<Value> {
    vec![
      self.customer_key.into(),
      self.customer_id.as_str().into(),
      self.first_name.as_str().into(),
      self.last_name.as_str().into(),
      self.email.as_str().into(),
      self.phone.as_str().into(),
      self.date_of_birth.into(),
      self.gender.as_str().into(),
      self.income_segment.as_str().into(),
      self.customer_segment.as_str().into(),
      self.registration_date.into(),
      self.is_active.into(),
    ]
  }

  fn from_row(row: &RowView<'_>) -> Result<Self> {
    Ok(Self {
      customer_key:      row.int("customer_key")?,
      customer_id:       row.text("customer_id")?,
      first_name:        row.text("first_name")?,
      last_name:         row.text("last_name")?,
      email:             row.text("email")?,
      phone:             row.text("phone")?,
      date_of_birth:     row.date("date_of_birth")?,
      gender:            row.text("gender")?,
      income_segment:    row.text("income_segment")?,
      customer_segment:  row.text("customer_segment")?,
      registration_date: row.date("registration_date")?,
      is_active:         row.bool("is_active")?,
    })
  }
}

// ─── Payment ─────────────────────────────────────────────────────────────────

pub const DIM_PAYMENT_COLUMNS: &[Column] = &[
  Column::new("payment_key", Int),
  Column::new("payment_method", Text),
  Column::new("payment_type", Text),
  Column::new("processing_fee_pct", Float),
  Column::new("is_digital", Bool),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimPayment {
  pub payment_key:        i64,
  pub payment_method:     String,
  pub payment_type:       String,
  pub processing_fee_pct: f64,
  pub is_digital:         bool,
}

impl Record for DimPayment {
  const TABLE: TableName = TableName::DimPayment;

  fn to_row(&self) -> Vec<Value> {
    vec![
      self.payment_key.into(),
      self.payment_method.as_str().into(),
      self.payment_type.as_str().into(),
      self.processing_fee_pct.into(),
      self.is_digital.into(),
    ]
  }

  fn from_row(row: &RowView<'_>) -> Result<Self> {
    Ok(Self {
      payment_key:        row.int("payment_key")?,
      payment_method:     row.text("payment_method")?,
      payment_type:       row.text("payment_type")?,
      processing_fee_pct: row.float("processing_fee_pct")?,
      is_digital:         row.bool("is_digital")?,
    })
  }
}

fn unsigned(row: &RowView<'_>, name: &str) -> Result<u32> {
  let v = row.int(name)?;
  u32::try_from(v).map_err(|_| crate::Error::InvalidValue {
    column: name.to_owned(),
    value:  v.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::RowSet;

  #[test]
  fn time_key_is_yyyymmdd() {
    let date = NaiveDate::from_ymd_opt(2023, 2, 5).unwrap();
    assert_eq!(time_key_for(date), 20230205);
  }

  #[test]
  fn far_future_is_end_of_9999() {
    assert_eq!(far_future(), NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());
  }

  #[test]
  fn columns_match_row_width() {
    let payment = DimPayment {
      payment_key:        1,
      payment_method:     "Cash".into(),
      payment_type:       "Physical".into(),
      processing_fee_pct: 0.0,
      is_digital:         false,
    };
    assert_eq!(payment.to_row().len(), DIM_PAYMENT_COLUMNS.len());
  }

  #[test]
  fn product_rows_decode_from_a_row_set() {
    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
    let product = DimProduct {
      product_key:     7,
      product_id:      "PROD-00007".into(),
      product_name:    "BrandA Laptops Teal".into(),
      category:        "Electronics".into(),
      subcategory:     "Laptops".into(),
      brand:           "BrandA".into(),
      unit_cost:       120.5,
      unit_price:      199.99,
      effective_date:  d(2024, 1, 1),
      expiration_date: far_future(),
      is_current:      true,
    };

    let rows = RowSet::from_records(std::slice::from_ref(&product));
    assert_eq!(rows.columns, TableName::DimProduct.column_names());
    assert_eq!(rows.to_records::<DimProduct>().unwrap(), vec![product]);
  }

  #[test]
  fn time_rows_decode_quarter_text() {
    let columns = TableName::DimTime.column_names();
    let date = NaiveDate::from_ymd_opt(2022, 11, 24).unwrap();
    let row = DimTime {
      time_key:       time_key_for(date),
      date,
      year:           2022,
      quarter:        Quarter::Q4,
      month:          11,
      month_name:     "November".into(),
      week:           47,
      day_of_month:   24,
      day_of_week:    4,
      day_name:       "Thursday".into(),
      is_weekend:     false,
      is_holiday:     true,
      fiscal_year:    2022,
      fiscal_quarter: "FY-Q4".into(),
      fiscal_period:  "FY2022-P10".into(),
    };
    let values = row.to_row();
    let decoded = DimTime::from_row(&RowView::new(&columns, &values)).unwrap();
    assert_eq!(decoded, row);
  }
}
