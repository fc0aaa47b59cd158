//! The sales fact generator.
//!
//! Dimensions must be fully materialised first: recency and Pareto weights
//! depend on population sizes, and every foreign key is drawn from an
//! existing dimension row.

use chrono::NaiveTime;
use olap_core::{
  TableName,
  dimension::{DimCustomer, DimGeography, DimPayment, DimProduct, DimTime},
  fact::{Measures, SalesFact},
};
use tracing::debug;

use crate::{
  Error, Result,
  error::require_positive,
  rng::{RngContext, round2},
  weights::{WeightedSampler, pareto_weights, recency_weights},
};

/// Relative frequency of 1..=5 line items per transaction.
pub const LINE_ITEM_WEIGHTS: [f64; 5] = [40.0, 30.0, 15.0, 10.0, 5.0];

/// Relative frequency of quantities 1..=5 per line item.
pub const QUANTITY_WEIGHTS: [f64; 5] = [50.0, 30.0, 12.0, 5.0, 3.0];

/// Share of line items that receive a discount.
pub const DISCOUNT_PROBABILITY: f64 = 0.2;
pub const DISCOUNT_RANGE: (f64, f64) = (0.05, 0.25);

/// Line prices vary around the catalogue price by this factor.
pub const PRICE_JITTER: (f64, f64) = (0.95, 1.05);

/// Transactions happen between `OPEN_HOUR:00` and `CLOSE_HOUR:00`.
pub const OPEN_HOUR: i64 = 8;
pub const CLOSE_HOUR: i64 = 22;

/// Borrowed dimension tables the facts reference.
#[derive(Debug, Clone, Copy)]
pub struct Dimensions<'a> {
  pub time:      &'a [DimTime],
  pub geography: &'a [DimGeography],
  pub products:  &'a [DimProduct],
  pub customers: &'a [DimCustomer],
  pub payments:  &'a [DimPayment],
}

impl Dimensions<'_> {
  fn require_non_empty(&self) -> Result<()> {
    let sizes = [
      (TableName::DimTime, self.time.len()),
      (TableName::DimGeography, self.geography.len()),
      (TableName::DimProduct, self.products.len()),
      (TableName::DimCustomer, self.customers.len()),
      (TableName::DimPayment, self.payments.len()),
    ];
    match sizes.into_iter().find(|(_, len)| *len == 0) {
      Some((table, _)) => Err(Error::EmptyDimension(table)),
      None => Ok(()),
    }
  }
}

/// Samplers built once per run.
struct Samplers<'a> {
  current_products: Vec<&'a DimProduct>,
  dates:            WeightedSampler,
  customers:        WeightedSampler,
  products:         WeightedSampler,
  line_items:       WeightedSampler,
  quantities:       WeightedSampler,
}

impl<'a> Samplers<'a> {
  fn new(dims: &Dimensions<'a>, pareto_factor: f64) -> Result<Self> {
    let current_products: Vec<&DimProduct> =
      dims.products.iter().filter(|p| p.is_current).collect();
    if current_products.is_empty() {
      return Err(Error::EmptyDimension(TableName::DimProduct));
    }

    Ok(Self {
      dates: WeightedSampler::new(&recency_weights(dims.time.len()))?,
      customers: WeightedSampler::new(&pareto_weights(
        dims.customers.len(),
        pareto_factor,
      ))?,
      products: WeightedSampler::new(&pareto_weights(
        current_products.len(),
        pareto_factor,
      ))?,
      line_items: WeightedSampler::new(&LINE_ITEM_WEIGHTS)?,
      quantities: WeightedSampler::new(&QUANTITY_WEIGHTS)?,
      current_products,
    })
  }
}

/// Generate `num_transactions` transactions of 1 to 5 line items each.
///
/// Dates are drawn with replacement, weighted towards later days; customers
/// and current products follow Pareto weights; geography and payment are
/// uniform.
pub fn generate_sales_fact(
  num_transactions: usize,
  dims: &Dimensions<'_>,
  pareto_factor: f64,
  rng: &mut RngContext,
) -> Result<Vec<SalesFact>> {
  require_positive("num_transactions", num_transactions)?;
  dims.require_non_empty()?;
  if !(0.0..=1.0).contains(&pareto_factor) {
    return Err(Error::Config(format!(
      "pareto_factor {pareto_factor} is outside [0, 1]"
    )));
  }

  let samplers = Samplers::new(dims, pareto_factor)?;
  debug!(
    dates = dims.time.len(),
    customers = dims.customers.len(),
    current_products = samplers.current_products.len(),
    "built fact samplers"
  );

  let expected_lines = num_transactions * 2;
  let mut facts = Vec::with_capacity(expected_lines);

  for transaction_id in 1..=num_transactions as i64 {
    let day = samplers.dates.choose(dims.time, rng.primary());
    let timestamp = day.date.and_time(business_time(rng));
    let geo = pick(dims.geography, rng);
    let customer = samplers.customers.choose(dims.customers, rng.primary());
    let payment = pick(dims.payments, rng);
    let line_count = samplers.line_items.sample(rng.primary()) + 1;

    for line_item_id in 1..=line_count as i32 {
      let product =
        *samplers.products.choose(&samplers.current_products, rng.primary());
      let quantity = samplers.quantities.sample(rng.primary()) as i32 + 1;
      let unit_price =
        round2(product.unit_price * rng.uniform(PRICE_JITTER.0, PRICE_JITTER.1));

      let gross = Measures::gross(quantity, unit_price);
      let discount_amount = if rng.chance(DISCOUNT_PROBABILITY) {
        round2(gross * rng.uniform(DISCOUNT_RANGE.0, DISCOUNT_RANGE.1))
      } else {
        0.0
      };
      let cost = Measures::line_cost(quantity, product.unit_cost);
      let m = Measures::derive(quantity, unit_price, cost, discount_amount);

      facts.push(SalesFact {
        transaction_id,
        line_item_id,
        transaction_date: day.date,
        transaction_timestamp: timestamp,
        time_key: day.time_key,
        geo_key: geo.geo_key,
        product_key: product.product_key,
        customer_key: customer.customer_key,
        payment_key: payment.payment_key,
        quantity,
        unit_price,
        revenue: m.revenue,
        cost: m.cost,
        discount_amount: m.discount_amount,
        profit: m.profit,
      });
    }
  }

  Ok(facts)
}

/// A uniform time of day in `[OPEN_HOUR:00, CLOSE_HOUR:00)`.
fn business_time(rng: &mut RngContext) -> NaiveTime {
  let hour = rng.int_in(OPEN_HOUR..=CLOSE_HOUR - 1) as u32;
  let minute = rng.int_in(0..=59) as u32;
  let second = rng.int_in(0..=59) as u32;
  NaiveTime::from_hms_opt(hour, minute, second).unwrap_or(NaiveTime::MIN)
}

/// Uniform choice from a dimension already checked to be non-empty.
fn pick<'a, T>(rows: &'a [T], rng: &mut RngContext) -> &'a T {
  let idx = rng.int_in(0..=rows.len() as i64 - 1) as usize;
  &rows[idx]
}
