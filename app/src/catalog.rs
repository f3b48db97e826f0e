// app/src/catalog.rs

//! Static table of purchasable offers.

use crate::models::{BillingMode, GrantKind};
use serde::Serialize;
use std::collections::HashMap;

pub const DIGITAL_ISSUE_TEMPLATE_ID: &str = "digital-issue";
pub const BACK_ISSUE_ID: &str = "back-issue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrantTemplate {
  pub kind: GrantKind,
  pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
  pub id: String,
  pub name: String,
  pub price_cents: i64,
  /// Processor price id. Empty means the offer cannot be sold.
  pub price_reference: String,
  pub billing_mode: BillingMode,
  pub features: Vec<String>,
  pub access_grant: Option<AccessGrantTemplate>,
}

impl CatalogEntry {
  pub fn is_recurring(&self) -> bool {
    self.billing_mode == BillingMode::Recurring
  }

  pub fn has_price_reference(&self) -> bool {
    !self.price_reference.trim().is_empty()
  }
}

#[derive(Debug, Clone)]
pub struct Catalog {
  entries: Vec<CatalogEntry>,
}

fn entry(
  id: &str,
  name: &str,
  price_cents: i64,
  price_reference: &str,
  billing_mode: BillingMode,
  features: &[&str],
  access_grant: Option<AccessGrantTemplate>,
) -> CatalogEntry {
  CatalogEntry {
    id: id.to_string(),
    name: name.to_string(),
    price_cents,
    price_reference: price_reference.to_string(),
    billing_mode,
    features: features.iter().map(|f| f.to_string()).collect(),
    access_grant,
  }
}

impl Catalog {
  pub fn standard() -> Self {
    use BillingMode::{OneTime, Recurring};
    Self {
      entries: vec![
        entry(
          "abo-1-an",
          "Abonnement 1 an",
          3300,
          "price_abo_1_an",
          Recurring,
          &["4 numéros papier", "Livraison offerte", "Accès aux archives en ligne"],
          None,
        ),
        entry(
          "abo-2-ans",
          "Abonnement 2 ans",
          6000,
          "price_abo_2_ans",
          Recurring,
          &["8 numéros papier", "Livraison offerte", "Accès aux archives en ligne"],
          None,
        ),
        entry(
          "abo-1-an-numerique",
          "Abonnement numérique 1 an",
          1900,
          "price_abo_1_an_numerique",
          Recurring,
          &["4 numéros en PDF", "Accès aux archives en ligne"],
          None,
        ),
        entry(
          DIGITAL_ISSUE_TEMPLATE_ID,
          "Numéro numérique",
          500,
          "price_digital_issue",
          OneTime,
          &["Lecture en ligne pendant 1 an"],
          Some(AccessGrantTemplate {
            kind: GrantKind::SingleIssue,
            days: 365,
          }),
        ),
        entry(
          "pass-30-jours",
          "Pass 30 jours",
          900,
          "price_pass_30_jours",
          OneTime,
          &["Tous les numéros en lecture pendant 30 jours"],
          Some(AccessGrantTemplate {
            kind: GrantKind::TimePass,
            days: 30,
          }),
        ),
        entry(
          BACK_ISSUE_ID,
          "Ancien numéro",
          990,
          "price_back_issue",
          OneTime,
          &["Numéro papier"],
          None,
        ),
      ],
    }
  }

  /// Replaces price references by catalog id. Unknown ids are ignored.
  pub fn with_price_references(mut self, overrides: &HashMap<String, String>) -> Self {
    for e in self.entries.iter_mut() {
      if let Some(reference) = overrides.get(&e.id) {
        e.price_reference = reference.clone();
      }
    }
    self
  }

  pub fn entries(&self) -> &[CatalogEntry] {
    &self.entries
  }

  fn by_id(&self, id: &str) -> Option<&CatalogEntry> {
    self.entries.iter().find(|e| e.id == id)
  }

  /// Exact ids, and `digital-<issue>` relabelled from the single-issue
  /// template. None for anything else, including a bare `digital-`.
  pub fn lookup(&self, id: &str) -> Option<CatalogEntry> {
    if let Some(found) = self.by_id(id) {
      return Some(found.clone());
    }
    let issue = digital_issue_ref(id)?;
    let template = self.by_id(DIGITAL_ISSUE_TEMPLATE_ID)?;
    let mut relabelled = template.clone();
    relabelled.id = id.to_string();
    relabelled.name = format!("{} {}", template.name, issue);
    Some(relabelled)
  }

  /// Never fails: ids `lookup` does not know resolve to the back-issue offer.
  pub fn resolve(&self, id: &str) -> CatalogEntry {
    if let Some(found) = self.lookup(id) {
      return found;
    }
    match self.by_id(BACK_ISSUE_ID) {
      Some(back_issue) => {
        let mut relabelled = back_issue.clone();
        relabelled.id = id.to_string();
        relabelled.name = format!("{} {}", back_issue.name, id);
        relabelled
      }
      None => entry(id, id, 0, "", BillingMode::OneTime, &[], None),
    }
  }
}

/// Issue slug a digital cart id refers to (`digital-n42` -> `n42`).
pub fn digital_issue_ref(item_id: &str) -> Option<&str> {
  item_id.strip_prefix("digital-").filter(|rest| !rest.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exact_ids_resolve_to_their_entry() {
    let catalog = Catalog::standard();
    let abo = catalog.resolve("abo-1-an");
    assert_eq!(abo.price_cents, 3300);
    assert!(abo.is_recurring());
    assert_eq!(catalog.resolve("abo-2-ans").price_cents, 6000);
    assert_eq!(catalog.resolve("abo-1-an-numerique").price_cents, 1900);

    let pass = catalog.resolve("pass-30-jours");
    assert_eq!(pass.price_cents, 900);
    assert_eq!(
      pass.access_grant,
      Some(AccessGrantTemplate {
        kind: GrantKind::TimePass,
        days: 30
      })
    );
  }

  #[test]
  fn digital_ids_use_the_issue_template() {
    let e = Catalog::standard().resolve("digital-n42");
    assert_eq!(e.id, "digital-n42");
    assert_eq!(e.price_cents, 500);
    assert!(e.name.ends_with("n42"));
    assert_eq!(e.access_grant.map(|g| (g.kind, g.days)), Some((GrantKind::SingleIssue, 365)));
    assert_eq!(digital_issue_ref("digital-n42"), Some("n42"));
    assert_eq!(digital_issue_ref("pass-30-jours"), None);
  }

  #[test]
  fn lookup_knows_only_listed_and_digital_issue_ids() {
    let catalog = Catalog::standard();
    assert!(catalog.lookup("pass-30-jours").is_some());
    assert_eq!(catalog.lookup("digital-n40").map(|e| e.price_cents), Some(500));
    assert!(catalog.lookup("pass-7-jours").is_none());
    assert!(catalog.lookup("digital-").is_none());
    assert!(catalog.lookup("n42").is_none());
  }

  #[test]
  fn unknown_ids_fall_back_to_back_issue() {
    let e = Catalog::standard().resolve("physical-xyz");
    assert_eq!(e.id, "physical-xyz");
    assert_eq!(e.price_cents, 990);
    assert_eq!(e.billing_mode, BillingMode::OneTime);
    assert!(e.access_grant.is_none());
  }

  #[test]
  fn price_reference_overrides() {
    let overrides: HashMap<String, String> = [
      ("abo-1-an".to_string(), "price_live_1".to_string()),
      ("pass-30-jours".to_string(), String::new()),
    ]
    .into_iter()
    .collect();
    let catalog = Catalog::standard().with_price_references(&overrides);
    assert_eq!(catalog.resolve("abo-1-an").price_reference, "price_live_1");
    assert!(!catalog.resolve("pass-30-jours").has_price_reference());
    assert!(catalog.resolve("abo-2-ans").has_price_reference());
  }
}
