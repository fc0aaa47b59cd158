//! The payment dimension: a fixed reference list.

use olap_core::dimension::DimPayment;

/// `(method, type, processing fee %, is digital)`.
pub const PAYMENT_METHODS: [(&str, &str, f64, bool); 7] = [
  ("Credit Card", "Card", 2.9, true),
  ("Debit Card", "Card", 1.5, true),
  ("PayPal", "Digital Wallet", 3.5, true),
  ("Apple Pay", "Digital Wallet", 2.5, true),
  ("Bank Transfer", "Electronic", 0.5, true),
  ("Cash", "Physical", 0.0, false),
  ("Check", "Physical", 0.0, false),
];

pub fn generate_dim_payment() -> Vec<DimPayment> {
  PAYMENT_METHODS
    .iter()
    .zip(1..)
    .map(|(&(method, kind, fee, digital), key)| DimPayment {
      payment_key:        key,
      payment_method:     method.to_owned(),
      payment_type:       kind.to_owned(),
      processing_fee_pct: fee,
      is_digital:         digital,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seven_methods_keyed_from_one() {
    let rows = generate_dim_payment();
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0].payment_key, 1);
    assert_eq!(rows[0].payment_method, "Credit Card");
    assert_eq!(rows[6].payment_key, 7);
    assert!(!rows[5].is_digital);
    assert_eq!(rows.iter().filter(|r| r.is_digital).count(), 5);
  }
}
