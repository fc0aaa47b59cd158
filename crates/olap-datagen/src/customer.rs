//! The customer dimension.

use chrono::{Days, NaiveDate};
use fake::{
  Fake,
  faker::{
    internet::en::FreeEmailProvider,
    name::en::{FirstName, LastName},
    phone_number::en::PhoneNumber,
  },
};
use olap_core::dimension::DimCustomer;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, error::require_positive, rng::RngContext};

pub const INCOME_SEGMENTS: [&str; 4] = [
  "Low (<30k)",
  "Medium (30k-75k)",
  "High (75k-150k)",
  "Premium (>150k)",
];

pub const GENDERS: [&str; 3] = ["M", "F", "Other"];

/// Default stand-in for "today".
pub const DEFAULT_REFERENCE_DATE: NaiveDate =
  match NaiveDate::from_ymd_opt(2024, 1, 1) {
    Some(d) => d,
    None => NaiveDate::MIN,
  };

/// Registration dates reach back this many days from the reference date.
pub const REGISTRATION_WINDOW_DAYS: i64 = 5 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerParams {
  pub num_customers:  usize,
  /// The "today" registration and birth dates are counted back from.
  pub reference_date: NaiveDate,
}

impl Default for CustomerParams {
  fn default() -> Self {
    Self {
      num_customers:  10_000,
      reference_date: DEFAULT_REFERENCE_DATE,
    }
  }
}

/// Loyalty tiers a customer of the given income segment may fall in.
pub fn loyalty_tiers(income_segment: &str) -> [&'static str; 2] {
  if income_segment.starts_with("Premium") {
    ["Gold", "Platinum"]
  } else if income_segment.starts_with("High") {
    ["Silver", "Gold"]
  } else {
    ["Bronze", "Silver"]
  }
}

pub fn generate_dim_customer(
  params: &CustomerParams,
  rng: &mut RngContext,
) -> Result<Vec<DimCustomer>> {
  require_positive("num_customers", params.num_customers)?;
  let today = params.reference_date;
  let days_before = |days: i64| {
    today
      .checked_sub_days(Days::new(days.unsigned_abs()))
      .ok_or_else(|| Error::Config(format!("{days} days before {today} is out of range")))
  };

  let mut rows = Vec::with_capacity(params.num_customers);
  for idx in 1..=params.num_customers {
    let days_ago = rng.int_in(0..=REGISTRATION_WINDOW_DAYS);
    let age_years = rng.int_in(18..=80);

    let income_segment = rng.pick_const(&INCOME_SEGMENTS);
    let customer_segment = rng.pick_const(&loyalty_tiers(income_segment));

    // Longer-registered customers are likelier to have lapsed.
    let lapse = days_ago as f64 / (2 * REGISTRATION_WINDOW_DAYS) as f64;
    let is_active = !rng.chance(lapse);

    let first_name: String = FirstName().fake_with_rng(rng.faker());
    let last_name: String = LastName().fake_with_rng(rng.faker());
    let provider: String = FreeEmailProvider().fake_with_rng(rng.faker());
    let phone: String = PhoneNumber().fake_with_rng(rng.faker());
    let email = format!(
      "{}.{}@{provider}",
      email_local_part(&first_name),
      email_local_part(&last_name)
    );

    rows.push(DimCustomer {
      customer_key: idx as i64,
      customer_id: format!("CUST-{idx:06}"),
      first_name,
      last_name,
      email,
      phone,
      date_of_birth: days_before(age_years * 365)?,
      gender: rng.pick_const(&GENDERS).to_owned(),
      income_segment: income_segment.to_owned(),
      customer_segment: customer_segment.to_owned(),
      registration_date: days_before(days_ago)?,
      is_active,
    });
  }
  Ok(rows)
}

fn email_local_part(name: &str) -> String {
  name
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_lowercase())
    .collect()
}
