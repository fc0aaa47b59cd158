//! The product dimension, with SCD type 2 history.

use chrono::NaiveDate;
use olap_core::dimension::{DimProduct, FAR_FUTURE};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  error::require_positive,
  rng::{RngContext, round2},
};

pub const CATEGORIES: [(&str, [&str; 4]); 5] = [
  ("Electronics", ["Smartphones", "Laptops", "Tablets", "Accessories"]),
  ("Clothing", ["Mens", "Womens", "Kids", "Accessories"]),
  ("Home & Garden", ["Furniture", "Decor", "Kitchen", "Outdoor"]),
  ("Sports", ["Equipment", "Apparel", "Footwear", "Accessories"]),
  ("Books", ["Fiction", "Non-Fiction", "Educational", "Comics"]),
];

pub const BRANDS: [&str; 7] = [
  "BrandA", "BrandB", "BrandC", "BrandD", "BrandE", "BrandF", "BrandG",
];

const COLOURS: [&str; 24] = [
  "Azure", "Beige", "Black", "Blue", "Bronze", "Coral", "Crimson", "Cyan",
  "Gold", "Gray", "Green", "Indigo", "Ivory", "Lavender", "Lime", "Magenta",
  "Maroon", "Navy", "Olive", "Orange", "Purple", "Silver", "Teal", "White",
];

/// Effective date of first versions.
pub const HISTORY_START: NaiveDate = match NaiveDate::from_ymd_opt(2022, 1, 1) {
  Some(d) => d,
  None => NaiveDate::MIN,
};

/// Effective date of changed products' current versions.
pub const CHANGE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 1, 1) {
  Some(d) => d,
  None => NaiveDate::MIN,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductParams {
  pub num_products: usize,
  /// Probability that a product carries one historical version.
  pub change_rate:  f64,
}

impl Default for ProductParams {
  fn default() -> Self {
    Self { num_products: 1000, change_rate: 0.1 }
  }
}

/// Emit `num_products` natural keys. A changed product yields a historical
/// row followed by its current row; keys follow emission order.
pub fn generate_dim_product(
  params: &ProductParams,
  rng: &mut RngContext,
) -> Result<Vec<DimProduct>> {
  require_positive("num_products", params.num_products)?;
  if !(0.0..=1.0).contains(&params.change_rate) {
    return Err(Error::Config(format!(
      "change_rate {} is outside [0, 1]",
      params.change_rate
    )));
  }

  let mut rows = Vec::with_capacity(params.num_products);
  for idx in 1..=params.num_products {
    let (category, subcategories) = rng.pick_const(&CATEGORIES);
    let subcategory = rng.pick_const(&subcategories);
    let brand = rng.pick_const(&BRANDS);
    let colour = COLOURS[rng.faker().random_range(0..COLOURS.len())];

    let unit_cost = round2(rng.uniform(5.0, 200.0));
    let unit_price = round2(unit_cost * rng.uniform(1.3, 2.5));
    let changed = rng.chance(params.change_rate);

    let version = |key: usize, cost: f64, price: f64, from: NaiveDate, to: NaiveDate| DimProduct {
      product_key:     key as i64,
      product_id:      format!("PROD-{idx:05}"),
      product_name:    format!("{brand} {subcategory} {colour}"),
      category:        category.to_owned(),
      subcategory:     subcategory.to_owned(),
      brand:           brand.to_owned(),
      unit_cost:       cost,
      unit_price:      price,
      effective_date:  from,
      expiration_date: to,
      is_current:      to == FAR_FUTURE,
    };

    if changed {
      let old_price = round2(unit_price * rng.uniform(0.8, 1.2));
      let old_cost = round2(old_price / rng.uniform(1.3, 2.5));
      rows.push(version(
        rows.len() + 1,
        old_cost,
        old_price,
        HISTORY_START,
        CHANGE_DATE,
      ));
      rows.push(version(rows.len() + 1, unit_cost, unit_price, CHANGE_DATE, FAR_FUTURE));
    } else {
      rows.push(version(
        rows.len() + 1,
        unit_cost,
        unit_price,
        HISTORY_START,
        FAR_FUTURE,
      ));
    }
  }
  Ok(rows)
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use olap_core::validate::validate_scd_type2;

  use super::*;

  fn generate(num_products: usize, change_rate: f64, seed: u64) -> Vec<DimProduct> {
    generate_dim_product(
      &ProductParams { num_products, change_rate },
      &mut RngContext::new(seed),
    )
    .unwrap()
  }

  #[test]
  fn fifty_products_at_ten_percent_change() {
    let rows = generate(50, 0.1, 42);
    // At most one historical row per product; a handful expected.
    assert!((50..=65).contains(&rows.len()), "rows = {}", rows.len());
    assert_eq!(rows.iter().filter(|r| r.is_current).count(), 50);
    validate_scd_type2(&rows).unwrap();
  }

  #[test]
  fn history_expires_when_current_begins() {
    let rows = generate(500, 0.3, 7);
    let mut by_id: BTreeMap<&str, Vec<&DimProduct>> = BTreeMap::new();
    for r in &rows {
      by_id.entry(&r.product_id).or_default().push(r);
    }
    assert_eq!(by_id.len(), 500);
    for versions in by_id.values() {
      let current: Vec<_> = versions.iter().filter(|v| v.is_current).collect();
      assert_eq!(current.len(), 1);
      assert_eq!(current[0].expiration_date, FAR_FUTURE);
      for old in versions.iter().filter(|v| !v.is_current) {
        assert_eq!(old.expiration_date, current[0].effective_date);
      }
    }
  }

  #[test]
  fn keys_are_sequential_and_prices_cover_cost() {
    let rows = generate(200, 0.5, 11);
    for (i, r) in rows.iter().enumerate() {
      assert_eq!(r.product_key, i as i64 + 1);
      assert!(r.unit_price > 0.0 && r.unit_cost > 0.0);
    }
    for r in rows.iter().filter(|r| r.is_current) {
      assert!((5.0..=200.0).contains(&r.unit_cost));
      assert!(r.unit_price >= r.unit_cost);
    }
  }

  #[test]
  fn change_rate_extremes() {
    let none = generate(30, 0.0, 1);
    assert_eq!(none.len(), 30);
    assert!(none.iter().all(|r| r.effective_date == HISTORY_START));

    let all = generate(30, 1.0, 1);
    assert_eq!(all.len(), 60);
    validate_scd_type2(&all).unwrap();
  }

  #[test]
  fn rejects_bad_parameters() {
    let mut rng = RngContext::new(42);
    let zero = ProductParams { num_products: 0, change_rate: 0.1 };
    assert!(generate_dim_product(&zero, &mut rng).is_err());
    let rate = ProductParams { num_products: 5, change_rate: 1.5 };
    assert!(generate_dim_product(&rate, &mut rng).is_err());
  }

  #[test]
  fn deterministic_per_seed() {
    assert_eq!(generate(40, 0.1, 42), generate(40, 0.1, 42));
    assert_ne!(generate(40, 0.1, 42), generate(40, 0.1, 43));
  }
}
