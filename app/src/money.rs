// app/src/money.rs

//! Amounts are integer cents everywhere; these helpers produce display forms.

pub const CURRENCY: &str = "eur";

/// Decimal form of a cent amount, for JSON payloads.
pub fn cents_to_decimal(cents: i64) -> f64 {
  cents as f64 / 100.0
}

/// French display form: `1234` -> `"12,34 €"`.
pub fn format_eur(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{}{},{:02} €", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_whole_and_fractional_amounts() {
    assert_eq!(format_eur(3300), "33,00 €");
    assert_eq!(format_eur(1660), "16,60 €");
    assert_eq!(format_eur(5), "0,05 €");
    assert_eq!(format_eur(0), "0,00 €");
    assert_eq!(format_eur(-990), "-9,90 €");
  }

  #[test]
  fn decimal_form() {
    assert_eq!(cents_to_decimal(1500), 15.0);
    assert_eq!(cents_to_decimal(450), 4.5);
  }
}
