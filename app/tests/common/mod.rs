// tests/common/mod.rs
#![allow(dead_code)]

use kiosque::config::AppConfig;
use kiosque::models::CheckoutRequest;
use kiosque::services::email_mock::MockMailer;
use kiosque::services::payment_mock::MockPaymentGateway;
use kiosque::services::storage_mock::MockStorage;
use kiosque::state::{AppState, Collaborators};
use kiosque::store::InMemoryStore;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

pub const ADMIN_EMAIL: &str = "admin@kiosque.example";

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kiosque=debug,kiosque_flow=debug,warn"));
  tracing_subscriber::fmt()
    .with_max_level(Level::TRACE)
    .with_env_filter(filter)
    .with_test_writer()
    .init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// Application state over mocks, with handles kept on every mock so tests can
/// steer and inspect them.
pub struct TestApp {
  pub state: AppState,
  pub store: Arc<InMemoryStore>,
  pub payments: Arc<MockPaymentGateway>,
  pub mailer: Arc<MockMailer>,
  pub storage: Arc<MockStorage>,
}

pub fn test_config() -> AppConfig {
  let mut config = AppConfig::from_lookup(|_| None).expect("defaults are a valid configuration");
  config.app_base_url = "https://shop.test".to_string();
  config.external_call_timeout = Duration::from_secs(2);
  config
}

pub fn test_app() -> TestApp {
  test_app_with(test_config())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
  setup_tracing();
  let store = Arc::new(InMemoryStore::seeded());
  let payments = Arc::new(MockPaymentGateway::new());
  let mailer = Arc::new(MockMailer::new());
  let storage = Arc::new(MockStorage::new());
  let state = AppState::new(
    config,
    Collaborators {
      payments: payments.clone(),
      orders: store.clone(),
      grants: store.clone(),
      issues: store.clone(),
      storage: storage.clone(),
      mailer: mailer.clone(),
    },
  );
  TestApp {
    state,
    store,
    payments,
    mailer,
    storage,
  }
}

pub fn customer_json(email: &str, country: &str) -> Value {
  json!({
    "firstName": "Camille",
    "lastName": "Durand",
    "email": email,
    "phone": "0601020304",
    "address": {
      "line1": "12 rue des Lilas",
      "postalCode": "75011",
      "city": "Paris",
      "country": country
    }
  })
}

/// `items` are `(id, quantity)` pairs.
pub fn checkout_request(items: &[(&str, i64)], email: &str, country: &str) -> CheckoutRequest {
  let items: Vec<Value> = items.iter().map(|(id, q)| json!({ "id": id, "quantity": q })).collect();
  serde_json::from_value(json!({ "items": items, "customer": customer_json(email, country) }))
    .expect("test checkout request deserializes")
}

pub fn config_with(overrides: &[(&str, &str)]) -> AppConfig {
  let vars: HashMap<String, String> = overrides.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
  let mut config = AppConfig::from_lookup(|name| vars.get(name).cloned()).expect("test configuration is valid");
  config.app_base_url = "https://shop.test".to_string();
  config.external_call_timeout = Duration::from_secs(2);
  config
}
