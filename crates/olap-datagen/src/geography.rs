//! The geography dimension: country, region, city.

use fake::{Fake, faker::address::en::CityName};
use olap_core::dimension::DimGeography;
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  error::require_positive,
  rng::RngContext,
};

pub const POPULATION_SEGMENTS: [&str; 4] = [
  "Small (<100k)",
  "Medium (100k-500k)",
  "Large (500k-1M)",
  "Metro (>1M)",
];

struct Country {
  name:      &'static str,
  code:      &'static str,
  timezone:  &'static str,
  regions:   [&'static str; 5],
  latitude:  (f64, f64),
  longitude: (f64, f64),
}

const COUNTRIES: [Country; 3] = [
  Country {
    name:      "United States",
    code:      "US",
    timezone:  "America/New_York",
    regions:   ["Northeast", "Southeast", "Midwest", "Southwest", "West"],
    latitude:  (24.5, 49.0),
    longitude: (-124.8, -66.9),
  },
  Country {
    name:      "United Kingdom",
    code:      "GB",
    timezone:  "Europe/London",
    regions:   [
      "England",
      "Scotland",
      "Wales",
      "Northern Ireland",
      "Greater London",
    ],
    latitude:  (50.0, 58.0),
    longitude: (-5.0, 2.0),
  },
  Country {
    name:      "Canada",
    code:      "CA",
    timezone:  "America/Toronto",
    regions:   ["Ontario", "Quebec", "British Columbia", "Alberta", "Manitoba"],
    latitude:  (42.0, 60.0),
    longitude: (-141.0, -52.0),
  },
];

/// Largest supported country and region counts.
pub const MAX_COUNTRIES: usize = COUNTRIES.len();
pub const MAX_REGIONS_PER_COUNTRY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeographyParams {
  /// Capped at [`MAX_COUNTRIES`].
  pub num_countries:       usize,
  /// Capped at [`MAX_REGIONS_PER_COUNTRY`].
  pub regions_per_country: usize,
  pub cities_per_region:   usize,
}

impl Default for GeographyParams {
  fn default() -> Self {
    Self {
      num_countries:       3,
      regions_per_country: 5,
      cities_per_region:   10,
    }
  }
}

impl GeographyParams {
  /// Rows [`generate_dim_geography`] will produce.
  pub fn row_count(&self) -> usize {
    self.num_countries.min(MAX_COUNTRIES)
      * self.regions_per_country.min(MAX_REGIONS_PER_COUNTRY)
      * self.cities_per_region
  }
}

pub fn generate_dim_geography(
  params: &GeographyParams,
  rng: &mut RngContext,
) -> Result<Vec<DimGeography>> {
  require_positive("num_countries", params.num_countries)?;
  require_positive("regions_per_country", params.regions_per_country)?;
  require_positive("cities_per_region", params.cities_per_region)?;

  let mut rows = Vec::with_capacity(params.row_count());
  for country in COUNTRIES.iter().take(params.num_countries) {
    for region in country.regions.iter().take(params.regions_per_country) {
      for _ in 0..params.cities_per_region {
        let city: String = CityName().fake_with_rng(rng.faker());
        let latitude = round6(rng.uniform(country.latitude.0, country.latitude.1));
        let longitude =
          round6(rng.uniform(country.longitude.0, country.longitude.1));
        let segment = rng.pick_const(&POPULATION_SEGMENTS);

        rows.push(DimGeography {
          geo_key: rows.len() as i64 + 1,
          city,
          region: (*region).to_owned(),
          country: country.name.to_owned(),
          country_code: country.code.to_owned(),
          latitude,
          longitude,
          population_segment: segment.to_owned(),
          timezone: country.timezone.to_owned(),
        });
      }
    }
  }
  Ok(rows)
}

fn round6(v: f64) -> f64 { (v * 1e6).round() / 1e6 }
