//! Deterministic generation of the star-schema dataset.
//!
//! Every generator takes an explicit [`RngContext`]; there is no global
//! random state. [`Dataset::generate`] rewinds the context before each table
//! so a table's content depends only on the seed and its own parameters.

pub mod customer;
pub mod error;
pub mod geography;
pub mod payment;
pub mod product;
pub mod rng;
pub mod sales;
pub mod time;
pub mod weights;

use chrono::NaiveDate;
use olap_core::{
  RowSet, TableName,
  dimension::{DimCustomer, DimGeography, DimPayment, DimProduct, DimTime},
  fact::{SALES_DATE_COLUMN, SalesFact},
  partition::tag_partitions,
  validate::{
    DimensionKeys, ForeignKey, IntegrityReport, check_referential_integrity,
    validate_fact_measures, validate_scd_type2, validate_time_dimension,
    validate_unique_keys,
  },
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use self::{
  error::{Error, Result},
  rng::RngContext,
};
use self::{
  customer::{CustomerParams, DEFAULT_REFERENCE_DATE, generate_dim_customer},
  geography::{GeographyParams, generate_dim_geography},
  payment::generate_dim_payment,
  product::{ProductParams, generate_dim_product},
  sales::{Dimensions, generate_sales_fact},
  time::generate_dim_time,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Parameters of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
  pub seed:                u64,
  pub start_date:          NaiveDate,
  pub end_date:            NaiveDate,
  pub num_countries:       usize,
  pub regions_per_country: usize,
  pub cities_per_region:   usize,
  pub num_products:        usize,
  pub product_change_rate: f64,
  pub num_customers:       usize,
  /// Stand-in for "today" in customer registration and birth dates.
  pub reference_date:      NaiveDate,
  pub num_transactions:    usize,
  pub pareto_factor:       f64,
}

impl Default for DatasetConfig {
  fn default() -> Self {
    Self {
      seed:                42,
      start_date:          NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
      end_date:            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
      num_countries:       3,
      regions_per_country: 5,
      cities_per_region:   10,
      num_products:        1000,
      product_change_rate: 0.1,
      num_customers:       10_000,
      reference_date:      DEFAULT_REFERENCE_DATE,
      num_transactions:    100_000,
      pareto_factor:       0.8,
    }
  }
}

impl DatasetConfig {
  pub fn geography(&self) -> GeographyParams {
    GeographyParams {
      num_countries:       self.num_countries,
      regions_per_country: self.regions_per_country,
      cities_per_region:   self.cities_per_region,
    }
  }

  pub fn products(&self) -> ProductParams {
    ProductParams {
      num_products: self.num_products,
      change_rate:  self.product_change_rate,
    }
  }

  pub fn customers(&self) -> CustomerParams {
    CustomerParams {
      num_customers:  self.num_customers,
      reference_date: self.reference_date,
    }
  }

  /// Reject configurations no generator could honour.
  pub fn validate(&self) -> Result<()> {
    if self.end_date < self.start_date {
      return Err(Error::Config(format!(
        "end_date {} precedes start_date {}",
        self.end_date, self.start_date
      )));
    }
    for (name, count) in [
      ("num_countries", self.num_countries),
      ("regions_per_country", self.regions_per_country),
      ("cities_per_region", self.cities_per_region),
      ("num_products", self.num_products),
      ("num_customers", self.num_customers),
      ("num_transactions", self.num_transactions),
    ] {
      error::require_positive(name, count)?;
    }
    for (name, rate) in [
      ("product_change_rate", self.product_change_rate),
      ("pareto_factor", self.pareto_factor),
    ] {
      if !(0.0..=1.0).contains(&rate) {
        return Err(Error::Config(format!("{name} {rate} is outside [0, 1]")));
      }
    }
    Ok(())
  }
}

// ─── Dataset ─────────────────────────────────────────────────────────────────

/// All six tables of one run, held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
  pub time:      Vec<DimTime>,
  pub geography: Vec<DimGeography>,
  pub products:  Vec<DimProduct>,
  pub customers: Vec<DimCustomer>,
  pub payments:  Vec<DimPayment>,
  pub sales:     Vec<SalesFact>,
}

impl Dataset {
  pub fn generate(config: &DatasetConfig) -> Result<Self> {
    config.validate()?;
    let mut rng = RngContext::new(config.seed);

    let time = generate_dim_time(config.start_date, config.end_date, &mut rng)?;
    info!(table = %TableName::DimTime, rows = time.len(), "generated");

    rng.rewind();
    let geography = generate_dim_geography(&config.geography(), &mut rng)?;
    info!(table = %TableName::DimGeography, rows = geography.len(), "generated");

    rng.rewind();
    let products = generate_dim_product(&config.products(), &mut rng)?;
    info!(
      table = %TableName::DimProduct,
      rows = products.len(),
      current = products.iter().filter(|p| p.is_current).count(),
      "generated"
    );

    rng.rewind();
    let customers = generate_dim_customer(&config.customers(), &mut rng)?;
    info!(table = %TableName::DimCustomer, rows = customers.len(), "generated");

    let payments = generate_dim_payment();
    info!(table = %TableName::DimPayment, rows = payments.len(), "generated");

    rng.rewind();
    let dims = Dimensions {
      time:      &time,
      geography: &geography,
      products:  &products,
      customers: &customers,
      payments:  &payments,
    };
    let sales = generate_sales_fact(
      config.num_transactions,
      &dims,
      config.pareto_factor,
      &mut rng,
    )?;
    info!(
      table = %TableName::FactSales,
      transactions = config.num_transactions,
      rows = sales.len(),
      "generated"
    );

    Ok(Self { time, geography, products, customers, payments, sales })
  }

  pub fn dimension_keys(&self) -> DimensionKeys {
    DimensionKeys::from_dimensions(
      &self.time,
      &self.geography,
      &self.products,
      &self.customers,
      &self.payments,
    )
  }

  /// Run every validator. Generator bugs are errors; orphaned foreign keys
  /// are reported.
  pub fn validate(&self) -> Result<IntegrityReport> {
    validate_unique_keys(TableName::DimTime, self.time.iter().map(|r| r.time_key))?;
    validate_unique_keys(
      TableName::DimGeography,
      self.geography.iter().map(|r| r.geo_key),
    )?;
    validate_unique_keys(
      TableName::DimProduct,
      self.products.iter().map(|r| r.product_key),
    )?;
    validate_unique_keys(
      TableName::DimCustomer,
      self.customers.iter().map(|r| r.customer_key),
    )?;
    validate_unique_keys(
      TableName::DimPayment,
      self.payments.iter().map(|r| r.payment_key),
    )?;
    validate_time_dimension(&self.time)?;
    validate_scd_type2(&self.products)?;
    validate_fact_measures(&self.sales)?;

    let report = check_referential_integrity(
      &self.sales,
      &self.dimension_keys(),
      &ForeignKey::ALL,
    );
    if !report.valid {
      warn!(orphans = ?report.orphan_counts, "referential integrity check failed");
    }
    Ok(report)
  }

  pub fn row_count(&self, table: TableName) -> usize {
    match table {
      TableName::DimTime => self.time.len(),
      TableName::DimGeography => self.geography.len(),
      TableName::DimProduct => self.products.len(),
      TableName::DimCustomer => self.customers.len(),
      TableName::DimPayment => self.payments.len(),
      TableName::FactSales => self.sales.len(),
    }
  }

  /// One table as a row set; the fact table carries `year` and `quarter`.
  pub fn table(&self, table: TableName) -> Result<RowSet> {
    Ok(match table {
      TableName::DimTime => RowSet::from_records(&self.time),
      TableName::DimGeography => RowSet::from_records(&self.geography),
      TableName::DimProduct => RowSet::from_records(&self.products),
      TableName::DimCustomer => RowSet::from_records(&self.customers),
      TableName::DimPayment => RowSet::from_records(&self.payments),
      TableName::FactSales => {
        tag_partitions(RowSet::from_records(&self.sales), SALES_DATE_COLUMN)?
      }
    })
  }

  /// Every table in load order.
  pub fn tables(&self) -> Result<Vec<(TableName, RowSet)>> {
    TableName::ALL
      .into_iter()
      .map(|t| Ok((t, self.table(t)?)))
      .collect()
  }
}
