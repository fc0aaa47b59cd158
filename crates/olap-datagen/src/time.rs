//! The calendar dimension.

use chrono::{Datelike, NaiveDate, Weekday};
use olap_core::{
  Quarter,
  dimension::{DimTime, time_key_for},
};

use crate::{Error, Result, rng::RngContext};

/// Fixed `(month, day)` holidays. Thanksgiving is approximated by Nov 24.
pub const HOLIDAYS: [(u32, u32); 4] = [(1, 1), (7, 4), (12, 25), (11, 24)];

/// First month of the fiscal year.
pub const FISCAL_YEAR_START_MONTH: u32 = 2;

/// One row per day in `[start, end]`. Draws nothing from `rng`.
pub fn generate_dim_time(
  start: NaiveDate,
  end: NaiveDate,
  _rng: &mut RngContext,
) -> Result<Vec<DimTime>> {
  if end < start {
    return Err(Error::Config(format!(
      "time range ends ({end}) before it starts ({start})"
    )));
  }

  Ok(start.iter_days().take_while(|d| *d <= end).map(calendar_row).collect())
}

fn calendar_row(date: NaiveDate) -> DimTime {
  let (year, month) = (date.year(), date.month());
  let fiscal_year = if month >= FISCAL_YEAR_START_MONTH { year } else { year - 1 };
  let fiscal_month = (month + 12 - FISCAL_YEAR_START_MONTH) % 12 + 1;
  let weekday = date.weekday();

  DimTime {
    time_key: time_key_for(date),
    date,
    year,
    quarter: Quarter::from_month(month),
    month,
    month_name: date.format("%B").to_string(),
    week: date.iso_week().week(),
    day_of_month: date.day(),
    day_of_week: weekday.number_from_monday(),
    day_name: date.format("%A").to_string(),
    is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
    is_holiday: HOLIDAYS.contains(&(month, date.day())),
    fiscal_year,
    fiscal_quarter: format!("FY-Q{}", (fiscal_month - 1) / 3 + 1),
    fiscal_period: format!("FY{fiscal_year}-P{fiscal_month:02}"),
  }
}

#[cfg(test)]
mod tests {
  use olap_core::validate::validate_time_dimension;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn one_row_per_day_of_2023() {
    let rows =
      generate_dim_time(d(2023, 1, 1), d(2023, 12, 31), &mut RngContext::new(42))
        .unwrap();
    assert_eq!(rows.len(), 365);
    assert_eq!(rows.first().unwrap().date, d(2023, 1, 1));
    assert_eq!(rows.last().unwrap().date, d(2023, 12, 31));
    for r in &rows {
      assert_eq!(
        r.time_key,
        i64::from(r.year) * 10000 + i64::from(r.month) * 100 + i64::from(r.day_of_month)
      );
    }
    validate_time_dimension(&rows).unwrap();
  }

  #[test]
  fn row_count_spans_leap_years() {
    let (start, end) = (d(2020, 2, 1), d(2021, 3, 1));
    let rows = generate_dim_time(start, end, &mut RngContext::new(1)).unwrap();
    assert_eq!(rows.len() as i64, (end - start).num_days() + 1);
  }

  #[test]
  fn single_day_and_inverted_ranges() {
    let mut rng = RngContext::new(42);
    assert_eq!(generate_dim_time(d(2023, 5, 5), d(2023, 5, 5), &mut rng).unwrap().len(), 1);
    assert!(matches!(
      generate_dim_time(d(2023, 5, 5), d(2023, 5, 4), &mut rng),
      Err(Error::Config(_))
    ));
  }

  #[test]
  fn independent_of_seed() {
    let a = generate_dim_time(d(2023, 1, 1), d(2023, 1, 31), &mut RngContext::new(1));
    let b = generate_dim_time(d(2023, 1, 1), d(2023, 1, 31), &mut RngContext::new(2));
    assert_eq!(a.unwrap(), b.unwrap());
  }

  #[test]
  fn fiscal_year_starts_in_february() {
    let jan = calendar_row(d(2023, 1, 15));
    assert_eq!(jan.fiscal_year, 2022);
    assert_eq!(jan.fiscal_period, "FY2022-P12");
    assert_eq!(jan.fiscal_quarter, "FY-Q4");

    let feb = calendar_row(d(2023, 2, 1));
    assert_eq!(feb.fiscal_year, 2023);
    assert_eq!(feb.fiscal_period, "FY2023-P01");
    assert_eq!(feb.fiscal_quarter, "FY-Q1");
  }

  #[test]
  fn calendar_attributes() {
    let july4 = calendar_row(d(2023, 7, 4));
    assert!(july4.is_holiday);
    assert_eq!(july4.day_name, "Tuesday");
    assert_eq!(july4.day_of_week, 2);
    assert_eq!(july4.month_name, "July");
    assert_eq!(july4.quarter, Quarter::Q3);
    assert!(!july4.is_weekend);

    let sunday = calendar_row(d(2023, 1, 1));
    assert_eq!(sunday.day_of_week, 7);
    assert!(sunday.is_weekend);
    assert_eq!(sunday.week, 52);
  }
}
