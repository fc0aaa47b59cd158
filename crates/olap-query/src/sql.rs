//! SQL literal rendering.

use olap_core::Value;

use crate::attribute::Attribute;

/// Render `value` as a SQL literal. Strings are single-quoted with embedded
/// quotes doubled; booleans follow the 0/1 storage convention.
pub fn literal(value: &Value) -> String {
  match value {
    Value::Null => "NULL".to_owned(),
    Value::Int(v) => v.to_string(),
    Value::Float(v) if v.is_finite() => format!("{v:?}"),
    Value::Float(_) => "NULL".to_owned(),
    Value::Bool(v) => i64::from(*v).to_string(),
    Value::Text(_) | Value::Date(_) | Value::Timestamp(_) => quote(&value.to_text()),
  }
}

pub fn quote(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

/// An equality predicate on a dimension attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
  pub attribute: Attribute,
  pub value:     Value,
}

impl Filter {
  pub fn new(attribute: Attribute, value: impl Into<Value>) -> Self {
    Self { attribute, value: value.into() }
  }

  pub fn to_sql(&self) -> String {
    match self.value {
      Value::Null => format!("{} IS NULL", self.attribute.qualified()),
      ref v => format!("{} = {}", self.attribute.qualified(), literal(v)),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn quotes_are_doubled() {
    assert_eq!(literal(&Value::from("Home & Garden")), "'Home & Garden'");
    assert_eq!(literal(&Value::from("O'Brien")), "'O''Brien'");
    assert_eq!(literal(&Value::from("'; DROP TABLE x; --")), "'''; DROP TABLE x; --'");
  }

  #[test]
  fn typed_literals() {
    assert_eq!(literal(&Value::Int(2024)), "2024");
    assert_eq!(literal(&Value::Float(1.5)), "1.5");
    assert_eq!(literal(&Value::Float(2.0)), "2.0");
    assert_eq!(literal(&Value::Bool(true)), "1");
    assert_eq!(
      literal(&Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())),
      "'2024-03-01'"
    );
    assert_eq!(literal(&Value::Null), "NULL");
  }

  #[test]
  fn filters_are_qualified() {
    assert_eq!(Filter::new(Attribute::Year, 2024).to_sql(), "dt.year = 2024");
    assert_eq!(
      Filter::new(Attribute::Country, "United States").to_sql(),
      "dg.country = 'United States'"
    );
    assert_eq!(
      Filter::new(Attribute::City, Value::Null).to_sql(),
      "dg.city IS NULL"
    );
  }
}
