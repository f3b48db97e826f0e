// app/src/shipping.rs

//! Shipping cost from the physical units in a cart and the destination zone.

use crate::money::cents_to_decimal;
use serde::{Deserialize, Serialize};

/// Subscription offers; shipping of the printed copies is included in the price.
pub const SUBSCRIPTION_IDS: [&str; 3] = ["abo-1-an", "abo-2-ans", "abo-1-an-numerique"];

/// Largest quantity accepted on one cart or quote line.
pub const MAX_LINE_QUANTITY: i64 = 999;

const DOMESTIC_COUNTRY: &str = "FR";

/// `(max_units, price_cents)`, ascending by `max_units`.
const DOMESTIC_TIERS: [(u64, i64); 4] = [(1, 450), (2, 750), (4, 1050), (9, 1500)];
const INTERNATIONAL_TIERS: [(u64, i64); 4] = [(1, 990), (2, 1660), (4, 2400), (9, 3600)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
  Subscription,
  Digital,
  Physical,
}

pub fn classify(item_id: &str) -> ItemClass {
  if SUBSCRIPTION_IDS.contains(&item_id) {
    ItemClass::Subscription
  } else if item_id.starts_with("digital-") || item_id.starts_with("pass-") {
    ItemClass::Digital
  } else {
    ItemClass::Physical
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingZone {
  Domestic,
  International,
}

impl ShippingZone {
  pub fn for_country(country_code: &str) -> Self {
    if country_code.trim().eq_ignore_ascii_case(DOMESTIC_COUNTRY) {
      ShippingZone::Domestic
    } else {
      ShippingZone::International
    }
  }

  fn tiers(self) -> &'static [(u64, i64)] {
    match self {
      ShippingZone::Domestic => &DOMESTIC_TIERS,
      ShippingZone::International => &INTERNATIONAL_TIERS,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ShippingZone::Domestic => "domestic",
      ShippingZone::International => "international",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
  pub zone: ShippingZone,
  pub physical_units: u64,
  pub cost_cents: i64,
  pub cost: f64,
}

/// One cart line as seen by the calculator.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippableItem {
  pub id: String,
  pub quantity: u32,
}

pub fn calculate_shipping<'a, I>(items: I, country_code: &str) -> ShippingQuote
where
  I: IntoIterator<Item = (&'a str, u64)>,
{
  let zone = ShippingZone::for_country(country_code);
  let physical_units: u64 = items
    .into_iter()
    .filter(|(id, _)| classify(id) == ItemClass::Physical)
    .fold(0u64, |units, (_, qty)| units.saturating_add(qty));
  let cost_cents = tier_price(zone.tiers(), physical_units);
  ShippingQuote {
    zone,
    physical_units,
    cost_cents,
    cost: cents_to_decimal(cost_cents),
  }
}

fn tier_price(tiers: &[(u64, i64)], units: u64) -> i64 {
  if units == 0 {
    return 0;
  }
  for &(max_units, price) in tiers {
    if units <= max_units {
      return price;
    }
  }
  match tiers.last() {
    // Several full parcels.
    Some(&(max_units, price)) => i64::try_from(units.div_ceil(max_units))
      .unwrap_or(i64::MAX)
      .saturating_mul(price),
    None => 0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn quote(items: &[(&str, u64)], country: &str) -> ShippingQuote {
    calculate_shipping(items.iter().copied(), country)
  }

  #[test]
  fn classification_is_disjoint() {
    assert_eq!(classify("abo-1-an"), ItemClass::Subscription);
    assert_eq!(classify("abo-1-an-numerique"), ItemClass::Subscription);
    assert_eq!(classify("digital-n42"), ItemClass::Digital);
    assert_eq!(classify("pass-30-jours"), ItemClass::Digital);
    assert_eq!(classify("n42"), ItemClass::Physical);
    // Only the allowlist counts as a subscription.
    assert_eq!(classify("abo-3-ans"), ItemClass::Physical);
  }

  #[test]
  fn subscription_and_digital_carts_ship_free() {
    for country in ["FR", "BE", "US", ""] {
      let q = quote(&[("abo-1-an", 1), ("digital-n42", 3), ("pass-30-jours", 1)], country);
      assert_eq!(q.physical_units, 0);
      assert_eq!(q.cost_cents, 0);
    }
  }

  #[test]
  fn domestic_tiers() {
    assert_eq!(quote(&[("n1", 1)], "FR").cost_cents, 450);
    assert_eq!(quote(&[("n1", 2)], "FR").cost_cents, 750);
    assert_eq!(quote(&[("n1", 3)], "FR").cost_cents, 1050);
    assert_eq!(quote(&[("n1", 2), ("n2", 2)], "FR").cost_cents, 1050);
    assert_eq!(quote(&[("n1", 9)], "FR").cost_cents, 1500);
    assert_eq!(quote(&[("n1", 10)], "FR").cost_cents, 2 * 1500);
    assert_eq!(quote(&[("n1", 19)], "FR").cost_cents, 3 * 1500);
  }

  #[test]
  fn international_tiers() {
    let q = quote(&[("physical-xyz", 2)], "BE");
    assert_eq!(q.zone, ShippingZone::International);
    assert_eq!(q.cost_cents, 1660);
    assert_eq!(q.cost, 16.6);
    assert_eq!(quote(&[("n1", 1)], "DE").cost_cents, 990);
    assert_eq!(quote(&[("n1", 4)], "US").cost_cents, 2400);
    assert_eq!(quote(&[("n1", 18)], "CH").cost_cents, 2 * 3600);
  }

  #[test]
  fn huge_quantities_saturate_instead_of_overflowing() {
    let q = quote(&[("n1", u64::MAX), ("n2", 1)], "FR");
    assert_eq!(q.physical_units, u64::MAX);
    assert_eq!(q.cost_cents, i64::MAX);
  }

  #[test]
  fn country_is_normalised() {
    assert_eq!(ShippingZone::for_country(" fr "), ShippingZone::Domestic);
    assert_eq!(ShippingZone::for_country("Fr"), ShippingZone::Domestic);
    assert_eq!(ShippingZone::for_country("FRA"), ShippingZone::International);
    assert_eq!(ShippingZone::for_country(""), ShippingZone::International);
  }

  #[test]
  fn subscriptions_do_not_count_as_physical_units() {
    let q = quote(&[("abo-2-ans", 1), ("n7", 1)], "FR");
    assert_eq!(q.physical_units, 1);
    assert_eq!(q.cost_cents, 450);
  }
}
