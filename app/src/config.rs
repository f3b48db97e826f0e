// app/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Memory,
  Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentBackend {
  Mock,
  Stripe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailBackend {
  Mock,
  Brevo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  Mock,
  Supabase,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Public storefront URL, used for the processor's success/cancel redirects.
  pub app_base_url: String,

  pub store_backend: StoreBackend,
  pub database_url: Option<String>,
  pub run_migrations: bool,

  pub payment_backend: PaymentBackend,
  pub stripe_secret_key: Option<String>,
  pub stripe_api_base: String,

  pub email_backend: EmailBackend,
  pub brevo_api_key: Option<String>,
  pub email_sender: String,
  pub admin_email: String,

  pub storage_backend: StorageBackend,
  pub supabase_url: Option<String>,
  pub supabase_service_key: Option<String>,
  pub storage_bucket: String,
  pub signed_url_ttl: Duration,

  pub external_call_timeout: Duration,
  /// Grants only open content once their originating session's order is paid.
  pub entitlement_require_paid: bool,
  /// Catalog id -> processor price reference overrides.
  pub price_references: HashMap<String, String>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any key lookup; `from_env` passes the
  /// process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let app_base_url = get_env("APP_BASE_URL")
      .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();

    let store_backend = match get_env("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string()).as_str() {
      "memory" => StoreBackend::Memory,
      "postgres" => StoreBackend::Postgres,
      other => return Err(AppError::Config(format!("Invalid STORE_BACKEND '{}'", other))),
    };
    let database_url = get_env("DATABASE_URL").ok();
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config("DATABASE_URL is required when STORE_BACKEND=postgres".to_string()));
    }
    let run_migrations = parse_bool(&get_env, "RUN_MIGRATIONS", false)?;

    let payment_backend = match get_env("PAYMENT_BACKEND").unwrap_or_else(|_| "mock".to_string()).as_str() {
      "mock" => PaymentBackend::Mock,
      "stripe" => PaymentBackend::Stripe,
      other => return Err(AppError::Config(format!("Invalid PAYMENT_BACKEND '{}'", other))),
    };
    let stripe_secret_key = get_env("STRIPE_SECRET_KEY").ok();
    if payment_backend == PaymentBackend::Stripe && stripe_secret_key.is_none() {
      return Err(AppError::Config("STRIPE_SECRET_KEY is required when PAYMENT_BACKEND=stripe".to_string()));
    }
    let stripe_api_base = get_env("STRIPE_API_BASE")
      .unwrap_or_else(|_| "https://api.stripe.com".to_string())
      .trim_end_matches('/')
      .to_string();

    let email_backend = match get_env("EMAIL_BACKEND").unwrap_or_else(|_| "mock".to_string()).as_str() {
      "mock" => EmailBackend::Mock,
      "brevo" => EmailBackend::Brevo,
      other => return Err(AppError::Config(format!("Invalid EMAIL_BACKEND '{}'", other))),
    };
    let brevo_api_key = get_env("BREVO_API_KEY").ok();
    if email_backend == EmailBackend::Brevo && brevo_api_key.is_none() {
      return Err(AppError::Config("BREVO_API_KEY is required when EMAIL_BACKEND=brevo".to_string()));
    }
    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|_| "abonnements@kiosque.example".to_string());
    let admin_email = get_env("ADMIN_EMAIL").unwrap_or_else(|_| "admin@kiosque.example".to_string());

    let storage_backend = match get_env("STORAGE_BACKEND").unwrap_or_else(|_| "mock".to_string()).as_str() {
      "mock" => StorageBackend::Mock,
      "supabase" => StorageBackend::Supabase,
      other => return Err(AppError::Config(format!("Invalid STORAGE_BACKEND '{}'", other))),
    };
    let supabase_url = get_env("SUPABASE_URL").ok().map(|u| u.trim_end_matches('/').to_string());
    let supabase_service_key = get_env("SUPABASE_SERVICE_KEY").ok();
    if storage_backend == StorageBackend::Supabase && (supabase_url.is_none() || supabase_service_key.is_none()) {
      return Err(AppError::Config(
        "SUPABASE_URL and SUPABASE_SERVICE_KEY are required when STORAGE_BACKEND=supabase".to_string(),
      ));
    }
    let storage_bucket = get_env("STORAGE_BUCKET").unwrap_or_else(|_| "issues".to_string());
    let signed_url_ttl = Duration::from_secs(parse_u64(&get_env, "SIGNED_URL_TTL_SECS", 600)?);

    let external_call_timeout = Duration::from_secs(parse_u64(&get_env, "EXTERNAL_CALL_TIMEOUT_SECS", 10)?);
    if external_call_timeout.is_zero() {
      return Err(AppError::Config("EXTERNAL_CALL_TIMEOUT_SECS must be positive".to_string()));
    }
    let entitlement_require_paid = parse_bool(&get_env, "ENTITLEMENT_REQUIRE_PAID", true)?;
    let price_references = match get_env("PRICE_REFERENCES") {
      Ok(raw) => parse_price_references(&raw)?,
      Err(_) => HashMap::new(),
    };

    tracing::info!(
      store = ?store_backend,
      payments = ?payment_backend,
      email = ?email_backend,
      storage = ?storage_backend,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      app_base_url,
      store_backend,
      database_url,
      run_migrations,
      payment_backend,
      stripe_secret_key,
      stripe_api_base,
      email_backend,
      brevo_api_key,
      email_sender,
      admin_email,
      storage_backend,
      supabase_url,
      supabase_service_key,
      storage_bucket,
      signed_url_ttl,
      external_call_timeout,
      entitlement_require_paid,
      price_references,
    })
  }
}

fn parse_bool(get_env: &impl Fn(&str) -> Result<String>, name: &str, default: bool) -> Result<bool> {
  match get_env(name) {
    Ok(raw) => raw
      .to_lowercase()
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid {} value: {}", name, e))),
    Err(_) => Ok(default),
  }
}

fn parse_u64(get_env: &impl Fn(&str) -> Result<String>, name: &str, default: u64) -> Result<u64> {
  match get_env(name) {
    Ok(raw) => raw
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid {} value: {}", name, e))),
    Err(_) => Ok(default),
  }
}

/// Parses `id=price_ref,id2=price_ref2`. An empty reference is kept so the
/// catalog entry becomes unresolvable.
fn parse_price_references(raw: &str) -> Result<HashMap<String, String>> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|pair| !pair.is_empty())
    .map(|pair| {
      let (id, reference) = pair
        .split_once('=')
        .ok_or_else(|| AppError::Config(format!("Invalid PRICE_REFERENCES entry '{}'", pair)))?;
      Ok((id.trim().to_string(), reference.trim().to_string()))
    })
    .collect()
}
