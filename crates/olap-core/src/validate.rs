//! Post-generation validators.
//!
//! Referential integrity is reported as data: the caller decides whether
//! orphans are fatal. SCD, measure, time and key violations are generator
//! bugs and surface as errors naming the offending rows.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::{
  Error, Result,
  dimension::{DimCustomer, DimGeography, DimPayment, DimProduct, DimTime, FAR_FUTURE, time_key_for},
  fact::{Measures, SalesFact},
  partition::Quarter,
  table::TableName,
  value::RowSet,
};

/// Maximum orphan values kept per foreign key.
pub const ORPHAN_SAMPLE_LIMIT: usize = 10;

/// Absolute tolerance for derived monetary measures.
pub const MEASURE_TOLERANCE: f64 = 0.01;

// ─── Foreign keys ────────────────────────────────────────────────────────────

/// A foreign key of the sales fact and the dimension it references.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKey {
  Time,
  Geography,
  Product,
  Customer,
  Payment,
}

impl ForeignKey {
  pub const ALL: [ForeignKey; 5] = [
    Self::Time,
    Self::Geography,
    Self::Product,
    Self::Customer,
    Self::Payment,
  ];

  /// The fact column holding the key.
  pub fn column(self) -> &'static str {
    match self {
      Self::Time => "time_key",
      Self::Geography => "geo_key",
      Self::Product => "product_key",
      Self::Customer => "customer_key",
      Self::Payment => "payment_key",
    }
  }

  pub fn dimension(self) -> TableName {
    match self {
      Self::Time => TableName::DimTime,
      Self::Geography => TableName::DimGeography,
      Self::Product => TableName::DimProduct,
      Self::Customer => TableName::DimCustomer,
      Self::Payment => TableName::DimPayment,
    }
  }

  pub fn of(self, fact: &SalesFact) -> i64 {
    match self {
      Self::Time => fact.time_key,
      Self::Geography => fact.geo_key,
      Self::Product => fact.product_key,
      Self::Customer => fact.customer_key,
      Self::Payment => fact.payment_key,
    }
  }

  pub fn for_dimension(table: TableName) -> Option<Self> {
    Self::ALL.into_iter().find(|fk| fk.dimension() == table)
  }
}

/// Primary key sets of the dimensions, indexed by the foreign key that
/// references them.
#[derive(Debug, Clone, Default)]
pub struct DimensionKeys {
  keys: BTreeMap<ForeignKey, HashSet<i64>>,
}

impl DimensionKeys {
  pub fn new() -> Self { Self::default() }

  pub fn from_dimensions(
    time: &[DimTime],
    geography: &[DimGeography],
    products: &[DimProduct],
    customers: &[DimCustomer],
    payments: &[DimPayment],
  ) -> Self {
    let mut keys = Self::new();
    keys.insert(ForeignKey::Time, time.iter().map(|r| r.time_key));
    keys.insert(ForeignKey::Geography, geography.iter().map(|r| r.geo_key));
    keys.insert(ForeignKey::Product, products.iter().map(|r| r.product_key));
    keys.insert(ForeignKey::Customer, customers.iter().map(|r| r.customer_key));
    keys.insert(ForeignKey::Payment, payments.iter().map(|r| r.payment_key));
    keys
  }

  /// Collect the primary key column of each dimension row set.
  pub fn from_row_sets<'a, I>(tables: I) -> Result<Self>
  where
    I: IntoIterator<Item = (TableName, &'a RowSet)>,
  {
    let mut keys = Self::new();
    for (table, rows) in tables {
      let Some(fk) = ForeignKey::for_dimension(table) else {
        continue;
      };
      let column = table.primary_key();
      let values = rows
        .column_values(column)?
        .map(|v| {
          v.as_int().ok_or_else(|| Error::TypeMismatch {
            column:   column.to_owned(),
            expected: "int",
            found:    v.kind(),
          })
        })
        .collect::<Result<Vec<_>>>()?;
      keys.insert(fk, values);
    }
    Ok(keys)
  }

  pub fn insert(&mut self, fk: ForeignKey, values: impl IntoIterator<Item = i64>) {
    self.keys.entry(fk).or_default().extend(values);
  }

  pub fn contains(&self, fk: ForeignKey, key: i64) -> bool {
    self.keys.get(&fk).is_some_and(|set| set.contains(&key))
  }
}

// ─── Referential integrity ───────────────────────────────────────────────────

/// Outcome of [`check_referential_integrity`], keyed by fact column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
  pub valid:          bool,
  pub orphan_counts:  BTreeMap<String, usize>,
  /// Up to [`ORPHAN_SAMPLE_LIMIT`] orphan values per key, ascending.
  pub orphan_samples: BTreeMap<String, Vec<i64>>,
}

impl IntegrityReport {
  fn record(&mut self, fk: ForeignKey, orphans: BTreeSet<i64>) {
    if orphans.is_empty() {
      return;
    }
    warn!(
      foreign_key = fk.column(),
      dimension = %fk.dimension(),
      orphans = orphans.len(),
      "fact rows reference missing dimension keys"
    );
    self.valid = false;
    self.orphan_counts.insert(fk.column().to_owned(), orphans.len());
    self.orphan_samples.insert(
      fk.column().to_owned(),
      orphans.into_iter().take(ORPHAN_SAMPLE_LIMIT).collect(),
    );
  }
}

/// Set difference of fact foreign keys against dimension keys, per key.
pub fn check_referential_integrity(
  facts: &[SalesFact],
  dims: &DimensionKeys,
  fks: &[ForeignKey],
) -> IntegrityReport {
  let mut report = IntegrityReport { valid: true, ..Default::default() };
  for &fk in fks {
    let orphans: BTreeSet<i64> = facts
      .iter()
      .map(|f| fk.of(f))
      .filter(|&k| !dims.contains(fk, k))
      .collect();
    report.record(fk, orphans);
  }
  report
}

/// As [`check_referential_integrity`], over fact rows read back from a store.
///
/// Null keys count as orphans under the value `0`.
pub fn check_referential_integrity_rows(
  facts: &RowSet,
  dims: &DimensionKeys,
  fks: &[ForeignKey],
) -> Result<IntegrityReport> {
  let mut report = IntegrityReport { valid: true, ..Default::default() };
  for &fk in fks {
    let orphans: BTreeSet<i64> = facts
      .column_values(fk.column())?
      .map(|v| v.as_int().unwrap_or(0))
      .filter(|&k| !dims.contains(fk, k))
      .collect();
    report.record(fk, orphans);
  }
  Ok(report)
}

// ─── SCD type 2 ──────────────────────────────────────────────────────────────

/// Check the validity intervals of every product's versions.
///
/// Per `product_id`: every interval is non-empty, exactly one row is current
/// and expires on 9999-12-31, and consecutive versions neither overlap nor
/// leave a gap.
pub fn validate_scd_type2(products: &[DimProduct]) -> Result<()> {
  let mut by_id: BTreeMap<&str, Vec<&DimProduct>> = BTreeMap::new();
  for p in products {
    by_id.entry(p.product_id.as_str()).or_default().push(p);
  }

  let mut violations: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
  let mut flag = |reason: &'static str, id: &str| {
    violations.entry(reason).or_default().push(id.to_owned());
  };

  for (id, mut versions) in by_id {
    versions.sort_by_key(|p| p.effective_date);

    if versions.iter().any(|p| p.effective_date >= p.expiration_date) {
      flag("effective date not before expiration date", id);
    }

    let current: Vec<_> = versions.iter().filter(|p| p.is_current).collect();
    match current.as_slice() {
      [] => flag("no current row", id),
      [only] if only.expiration_date != FAR_FUTURE => {
        flag("current row does not expire on 9999-12-31", id)
      }
      [_] => {}
      _ => flag("multiple current rows", id),
    }

    for pair in versions.windows(2) {
      let (prev, next) = (pair[0], pair[1]);
      if prev.expiration_date > next.effective_date {
        flag("overlapping validity intervals", id);
      } else if prev.expiration_date < next.effective_date {
        flag("gap between validity intervals", id);
      }
    }
  }

  match violations.into_iter().next() {
    None => Ok(()),
    Some((reason, mut product_ids)) => {
      product_ids.dedup();
      Err(Error::ScdViolation { reason, product_ids })
    }
  }
}

// ─── Measures ────────────────────────────────────────────────────────────────

/// Check that revenue and profit follow from the line's inputs.
pub fn validate_fact_measures(facts: &[SalesFact]) -> Result<()> {
  type Check = (&'static str, fn(&SalesFact) -> bool);
  let checks: [Check; 4] = [
    ("revenue differs from quantity * unit_price - discount", |f| {
      let expected =
        f64::from(f.quantity) * f.unit_price - f.discount_amount;
      (f.revenue - expected).abs() >= MEASURE_TOLERANCE
    }),
    ("profit differs from revenue - cost", |f| {
      (f.profit - (f.revenue - f.cost)).abs() >= MEASURE_TOLERANCE
    }),
    ("negative measure", |f| {
      f.quantity < 0
        || f.unit_price < 0.0
        || f.revenue < 0.0
        || f.cost < 0.0
        || f.discount_amount < 0.0
    }),
    ("discount exceeds pre-discount revenue", |f| {
      f.discount_amount > Measures::gross(f.quantity, f.unit_price)
    }),
  ];

  for (reason, failed) in checks {
    let mut offenders = facts.iter().filter(|f| failed(f));
    if let Some(first) = offenders.next() {
      return Err(Error::MeasureMismatch {
        reason,
        count: 1 + offenders.count(),
        first: (first.transaction_id, first.line_item_id),
      });
    }
  }
  Ok(())
}

// ─── Time dimension ──────────────────────────────────────────────────────────

const MIN_TIME_KEY: i64 = 1900_01_01;
const MAX_TIME_KEY: i64 = 9999_12_31;

pub fn validate_time_dimension(rows: &[DimTime]) -> Result<()> {
  type Check = (&'static str, fn(&DimTime) -> bool);
  let checks: [Check; 3] = [
    ("time key out of range", |r| {
      !(MIN_TIME_KEY..=MAX_TIME_KEY).contains(&r.time_key)
    }),
    ("time key does not encode the date", |r| {
      r.time_key != time_key_for(r.date)
    }),
    ("quarter does not match month", |r| {
      r.quarter != Quarter::from_month(r.month)
    }),
  ];

  for (reason, failed) in checks {
    let count = rows.iter().filter(|r| failed(r)).count();
    if count > 0 {
      return Err(Error::TimeDimension { reason, count });
    }
  }
  Ok(())
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Fail if any surrogate key appears more than once.
pub fn validate_unique_keys(
  table: TableName,
  keys: impl IntoIterator<Item = i64>,
) -> Result<()> {
  let mut seen = HashSet::new();
  let mut dupes = BTreeSet::new();
  for key in keys {
    if !seen.insert(key) {
      dupes.insert(key);
    }
  }
  if dupes.is_empty() {
    Ok(())
  } else {
    Err(Error::DuplicateKeys {
      table,
      keys: dupes.into_iter().take(ORPHAN_SAMPLE_LIMIT).collect(),
    })
  }
}
