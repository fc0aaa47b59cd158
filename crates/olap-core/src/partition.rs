//! The partition key model.
//!
//! Fact row tagging, file store directory names and SQL partition predicates
//! all derive from the functions here and must agree.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
  Error, Result,
  value::{Column, ColumnType, RowSet, Value},
};

pub const YEAR_COLUMN: &str = "year";
pub const QUARTER_COLUMN: &str = "quarter";

/// Partition columns in path order.
pub const PARTITION_COLUMNS: &[Column] = &[
  Column::new(YEAR_COLUMN, ColumnType::Int),
  Column::new(QUARTER_COLUMN, ColumnType::Text),
];

// ─── Quarter ─────────────────────────────────────────────────────────────────

/// A calendar quarter, rendered as `Q1`..`Q4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quarter {
  Q1,
  Q2,
  Q3,
  Q4,
}

impl Quarter {
  pub const ALL: [Quarter; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

  /// `Q((month - 1) / 3 + 1)`. Months outside 1..=12 are clamped.
  pub fn from_month(month: u32) -> Self {
    match month.clamp(1, 12) {
      1..=3 => Self::Q1,
      4..=6 => Self::Q2,
      7..=9 => Self::Q3,
      _ => Self::Q4,
    }
  }

  pub fn from_number(n: u32) -> Result<Self> {
    match n {
      1 => Ok(Self::Q1),
      2 => Ok(Self::Q2),
      3 => Ok(Self::Q3),
      4 => Ok(Self::Q4),
      other => Err(Error::InvalidQuarter(other.to_string())),
    }
  }

  pub fn number(self) -> u32 {
    match self {
      Self::Q1 => 1,
      Self::Q2 => 2,
      Self::Q3 => 3,
      Self::Q4 => 4,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Q1 => "Q1",
      Self::Q2 => "Q2",
      Self::Q3 => "Q3",
      Self::Q4 => "Q4",
    }
  }
}

impl fmt::Display for Quarter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Quarter {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|q| q.as_str() == s)
      .ok_or_else(|| Error::InvalidQuarter(s.to_owned()))
  }
}

impl Serialize for Quarter {
  fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for Quarter {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(d)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

// ─── PartitionKey ────────────────────────────────────────────────────────────

/// The `(year, quarter)` pair a fact row is filed under.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PartitionKey {
  pub year:    i32,
  pub quarter: Quarter,
}

impl PartitionKey {
  pub fn new(year: i32, quarter: Quarter) -> Self { Self { year, quarter } }

  pub fn from_date(date: NaiveDate) -> Self {
    Self {
      year:    date.year(),
      quarter: Quarter::from_month(date.month()),
    }
  }

  /// `year=<yyyy>/quarter=<Qn>`, relative to a table directory.
  pub fn relative_path(&self) -> String {
    build_partition_path(&self.segments())
  }

  /// Key/value pairs in path order.
  pub fn segments(&self) -> [(&'static str, String); 2] {
    [
      (YEAR_COLUMN, self.year.to_string()),
      (QUARTER_COLUMN, self.quarter.to_string()),
    ]
  }

  /// Partition column cells, in [`PARTITION_COLUMNS`] order.
  pub fn values(&self) -> [Value; 2] {
    [
      Value::Int(i64::from(self.year)),
      Value::Text(self.quarter.to_string()),
    ]
  }

  /// Recover a key from any path containing `year=` and `quarter=` segments.
  pub fn from_path(path: &str) -> Result<Self> {
    Self::try_from(&parse_partition_path(path))
      .map_err(|_| Error::InvalidPartitionPath(path.to_owned()))
  }
}

impl TryFrom<&BTreeMap<String, String>> for PartitionKey {
  type Error = Error;

  fn try_from(map: &BTreeMap<String, String>) -> Result<Self> {
    let year = map
      .get(YEAR_COLUMN)
      .ok_or_else(|| Error::MissingColumn(YEAR_COLUMN.to_owned()))?;
    let quarter = map
      .get(QUARTER_COLUMN)
      .ok_or_else(|| Error::MissingColumn(QUARTER_COLUMN.to_owned()))?;

    Ok(Self {
      year:    year.parse().map_err(|_| Error::InvalidValue {
        column: YEAR_COLUMN.to_owned(),
        value:  year.clone(),
      })?,
      quarter: quarter.parse()?,
    })
  }
}

impl fmt::Display for PartitionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.relative_path())
  }
}

// ─── Free functions ──────────────────────────────────────────────────────────

pub fn partition_key(date: NaiveDate) -> PartitionKey {
  PartitionKey::from_date(date)
}

/// `"{base}/year={year}/quarter={quarter}"`. An empty base yields the bare
/// relative path.
pub fn partition_path(date: NaiveDate, base: &str) -> String {
  let relative = PartitionKey::from_date(date).relative_path();
  let base = base.trim_end_matches('/');
  if base.is_empty() {
    relative
  } else {
    format!("{base}/{relative}")
  }
}

/// Split on `/`, then each segment on its first `=`. Segments without `=` are
/// skipped, so base directories may precede the partition segments.
pub fn parse_partition_path(path: &str) -> BTreeMap<String, String> {
  path
    .split('/')
    .filter_map(|segment| segment.split_once('='))
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

/// Join `key=value` segments in the order given. Never reorders.
pub fn build_partition_path<K: AsRef<str>, V: AsRef<str>>(
  segments: &[(K, V)],
) -> String {
  segments
    .iter()
    .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
    .collect::<Vec<_>>()
    .join("/")
}

/// Append `year` and `quarter` columns derived from `date_column`.
///
/// Fails if the rows already carry either column or if a date cell is not a
/// date.
pub fn tag_partitions(mut rows: RowSet, date_column: &str) -> Result<RowSet> {
  let idx = rows
    .column_index(date_column)
    .ok_or_else(|| Error::MissingColumn(date_column.to_owned()))?;

  for col in PARTITION_COLUMNS {
    if rows.column_index(col.name).is_some() {
      return Err(Error::InvalidParameter(format!(
        "rows already carry partition column {:?}",
        col.name
      )));
    }
  }

  for row in &mut rows.rows {
    let date = row[idx].as_date().ok_or_else(|| Error::TypeMismatch {
      column:   date_column.to_owned(),
      expected: "date",
      found:    row[idx].kind(),
    })?;
    row.extend(PartitionKey::from_date(date).values());
  }
  rows
    .columns
    .extend(PARTITION_COLUMNS.iter().map(|c| c.name.to_owned()));

  Ok(rows)
}

/// Extract the partition key of every row from its tagged columns.
pub fn row_partition_keys(rows: &RowSet) -> Result<Vec<PartitionKey>> {
  rows
    .views()
    .map(|view| {
      let year = view.int32(YEAR_COLUMN)?;
      let quarter = view.text(QUARTER_COLUMN)?.parse()?;
      Ok(PartitionKey::new(year, quarter))
    })
    .collect()
}

// ─── PartitionFilter ─────────────────────────────────────────────────────────

/// An equality filter over partition columns. Empty means "everything".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFilter {
  pub year:    Option<i32>,
  pub quarter: Option<Quarter>,
}

impl PartitionFilter {
  pub fn all() -> Self { Self::default() }

  pub fn year(year: i32) -> Self {
    Self { year: Some(year), quarter: None }
  }

  pub fn year_quarter(year: i32, quarter: Quarter) -> Self {
    Self { year: Some(year), quarter: Some(quarter) }
  }

  pub fn is_empty(&self) -> bool {
    self.year.is_none() && self.quarter.is_none()
  }

  pub fn matches(&self, key: &PartitionKey) -> bool {
    self.year.is_none_or(|y| y == key.year)
      && self.quarter.is_none_or(|q| q == key.quarter)
  }

  /// `year = 2024 AND quarter = 'Q1'`, or `None` when empty.
  pub fn to_sql_predicate(&self) -> Option<String> {
    self.to_sql_predicate_for(None)
  }

  /// The predicate with columns qualified by `alias`.
  pub fn to_sql_predicate_for(&self, alias: Option<&str>) -> Option<String> {
    let col = |name: &str| match alias {
      Some(a) => format!("{a}.{name}"),
      None => name.to_owned(),
    };

    let mut conds = Vec::new();
    if let Some(year) = self.year {
      conds.push(format!("{} = {year}", col(YEAR_COLUMN)));
    }
    if let Some(quarter) = self.quarter {
      conds.push(format!("{} = '{quarter}'", col(QUARTER_COLUMN)));
    }

    (!conds.is_empty()).then(|| conds.join(" AND "))
  }

  pub fn filter_partitions<'a, I>(&self, keys: I) -> Vec<PartitionKey>
  where
    I: IntoIterator<Item = &'a PartitionKey>,
  {
    keys.into_iter().filter(|k| self.matches(k)).copied().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn quarter_boundaries() {
    assert_eq!(partition_key(d(2023, 1, 1)).quarter, Quarter::Q1);
    assert_eq!(partition_key(d(2023, 3, 31)).quarter, Quarter::Q1);
    assert_eq!(partition_key(d(2023, 4, 1)).quarter, Quarter::Q2);
    assert_eq!(partition_key(d(2023, 9, 30)).quarter, Quarter::Q3);
    assert_eq!(partition_key(d(2023, 12, 31)).quarter, Quarter::Q4);
  }

  #[test]
  fn quarter_matches_month_formula_for_every_month() {
    for month in 1..=12 {
      assert_eq!(Quarter::from_month(month).number(), (month - 1) / 3 + 1);
    }
  }

  #[test]
  fn path_for_mid_february() {
    assert_eq!(
      partition_path(d(2023, 2, 15), "data/parquet/fact_sales"),
      "data/parquet/fact_sales/year=2023/quarter=Q1"
    );
    assert_eq!(partition_path(d(2023, 2, 15), ""), "year=2023/quarter=Q1");
    assert_eq!(
      partition_path(d(2023, 2, 15), "base/"),
      "base/year=2023/quarter=Q1"
    );
  }

  #[test]
  fn parse_is_left_inverse_of_path() {
    let mut date = d(2020, 1, 1);
    let end = d(2024, 12, 31);
    while date <= end {
      let parsed = parse_partition_path(&partition_path(date, "root/fact_sales"));
      let key = partition_key(date);
      assert_eq!(parsed.get("year"), Some(&date.year().to_string()));
      assert_eq!(
        parsed.get("quarter"),
        Some(&format!("Q{}", (date.month() - 1) / 3 + 1))
      );
      assert_eq!(PartitionKey::try_from(&parsed).unwrap(), key);
      date = date.succ_opt().unwrap();
    }
  }

  #[test]
  fn parse_splits_on_first_equals_only() {
    let parsed = parse_partition_path("a=b=c/plain/year=2023");
    assert_eq!(parsed.get("a").map(String::as_str), Some("b=c"));
    assert_eq!(parsed.get("year").map(String::as_str), Some("2023"));
    assert_eq!(parsed.len(), 2);
  }

  #[test]
  fn build_keeps_segment_order() {
    let path = build_partition_path(&[("year", "2023"), ("quarter", "Q1")]);
    assert_eq!(path, "year=2023/quarter=Q1");
    assert_eq!(path, PartitionKey::new(2023, Quarter::Q1).relative_path());
  }

  #[test]
  fn quarters_parse_only_in_canonical_spelling() {
    for q in Quarter::ALL {
      assert_eq!(q.as_str().parse::<Quarter>().unwrap(), q);
    }
    assert!("q1".parse::<Quarter>().is_err());
    assert!(" Q1".parse::<Quarter>().is_err());
  }

  #[test]
  fn from_path_rejects_incomplete_paths() {
    assert!(PartitionKey::from_path("t/year=2023").is_err());
    assert!(PartitionKey::from_path("t/year=abc/quarter=Q1").is_err());
    assert!(PartitionKey::from_path("t/year=2023/quarter=Q5").is_err());
    assert!(PartitionKey::from_path("t/year=2023/quarter=q1").is_err());
    assert_eq!(
      PartitionKey::from_path("t/year=2023/quarter=Q3").unwrap(),
      PartitionKey::new(2023, Quarter::Q3)
    );
  }

  #[test]
  fn tagging_appends_columns_from_the_date() {
    let mut rows = RowSet::new(vec!["id".into(), "transaction_date".into()]);
    rows.push(vec![Value::Int(1), Value::Date(d(2022, 8, 9))]).unwrap();
    rows.push(vec![Value::Int(2), Value::Date(d(2023, 11, 30))]).unwrap();

    let tagged = tag_partitions(rows, "transaction_date").unwrap();
    assert_eq!(tagged.columns[2..], ["year".to_string(), "quarter".to_string()]);
    assert_eq!(
      row_partition_keys(&tagged).unwrap(),
      vec![
        PartitionKey::new(2022, Quarter::Q3),
        PartitionKey::new(2023, Quarter::Q4)
      ]
    );

    assert!(tag_partitions(tagged, "transaction_date").is_err());
  }

  #[test]
  fn filter_predicates() {
    assert_eq!(PartitionFilter::all().to_sql_predicate(), None);
    assert_eq!(
      PartitionFilter::year(2024).to_sql_predicate().unwrap(),
      "year = 2024"
    );
    assert_eq!(
      PartitionFilter::year_quarter(2024, Quarter::Q1)
        .to_sql_predicate_for(Some("fs"))
        .unwrap(),
      "fs.year = 2024 AND fs.quarter = 'Q1'"
    );
  }

  #[test]
  fn filter_matching() {
    let keys = [
      PartitionKey::new(2022, Quarter::Q4),
      PartitionKey::new(2023, Quarter::Q1),
      PartitionKey::new(2023, Quarter::Q2),
    ];
    assert_eq!(PartitionFilter::all().filter_partitions(&keys).len(), 3);
    assert_eq!(PartitionFilter::year(2023).filter_partitions(&keys).len(), 2);
    assert_eq!(
      PartitionFilter::year_quarter(2023, Quarter::Q2).filter_partitions(&keys),
      vec![keys[2]]
    );
    let by_quarter = PartitionFilter { year: None, quarter: Some(Quarter::Q4) };
    assert_eq!(by_quarter.filter_partitions(&keys), vec![keys[0]]);
  }
}
