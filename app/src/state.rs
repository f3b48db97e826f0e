// app/src/state.rs
use crate::catalog::Catalog;
use crate::config::{AppConfig, EmailBackend, PaymentBackend, StorageBackend, StoreBackend};
use crate::errors::{AppError, Result as AppResult};
use crate::pipelines;
use crate::services::brevo::BrevoMailer;
use crate::services::email::Mailer;
use crate::services::email_mock::MockMailer;
use crate::services::payment::PaymentGateway;
use crate::services::payment_mock::MockPaymentGateway;
use crate::services::storage::ObjectStorage;
use crate::services::storage_mock::MockStorage;
use crate::services::stripe::StripeGateway;
use crate::services::supabase::SupabaseStorage;
use crate::store::{GrantStore, InMemoryStore, IssueStore, OrderStore, PgStore};
use kiosque_flow::FlowRegistry;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

/// The collaborators a request can reach. Built once at startup.
#[derive(Clone)]
pub struct Collaborators {
  pub payments: Arc<dyn PaymentGateway>,
  pub orders: Arc<dyn OrderStore>,
  pub grants: Arc<dyn GrantStore>,
  pub issues: Arc<dyn IssueStore>,
  pub storage: Arc<dyn ObjectStorage>,
  pub mailer: Arc<dyn Mailer>,
}

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub catalog: Arc<Catalog>,
  pub payments: Arc<dyn PaymentGateway>,
  pub orders: Arc<dyn OrderStore>,
  pub grants: Arc<dyn GrantStore>,
  pub issues: Arc<dyn IssueStore>,
  pub storage: Arc<dyn ObjectStorage>,
  pub mailer: Arc<dyn Mailer>,
  pub flows: Arc<FlowRegistry<AppError>>,
}

impl AppState {
  /// Wires the state and registers the checkout and reconciliation flows.
  pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
    let catalog = Catalog::standard().with_price_references(&config.price_references);
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_flows(&flows, &config);
    Self {
      config: Arc::new(config),
      catalog: Arc::new(catalog),
      payments: collaborators.payments,
      orders: collaborators.orders,
      grants: collaborators.grants,
      issues: collaborators.issues,
      storage: collaborators.storage,
      mailer: collaborators.mailer,
      flows,
    }
  }

  /// Builds the configured backends: HTTP clients, database pool or the
  /// in-memory store, and mocks where selected.
  pub async fn from_config(config: AppConfig) -> AppResult<Self> {
    let http = reqwest::Client::builder()
      .timeout(config.external_call_timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Could not build HTTP client: {}", e)))?;

    let (orders, grants, issues): (Arc<dyn OrderStore>, Arc<dyn GrantStore>, Arc<dyn IssueStore>) =
      match config.store_backend {
        StoreBackend::Memory => {
          tracing::warn!("Using the in-memory store; data is lost on restart.");
          let store = Arc::new(InMemoryStore::seeded());
          (store.clone(), store.clone(), store)
        }
        StoreBackend::Postgres => {
          let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))?;
          let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(config.external_call_timeout)
            .connect(url)
            .await?;
          tracing::info!("Successfully connected to the database.");
          let store = Arc::new(PgStore::new(pool));
          if config.run_migrations {
            store
              .run_migrations()
              .await
              .map_err(|e| AppError::Internal(format!("Migrations failed: {}", e)))?;
            tracing::info!("Database migrations applied.");
          }
          (store.clone(), store.clone(), store)
        }
      };

    let payments: Arc<dyn PaymentGateway> = match config.payment_backend {
      PaymentBackend::Mock => Arc::new(MockPaymentGateway::new()),
      PaymentBackend::Stripe => Arc::new(StripeGateway::new(
        http.clone(),
        config.stripe_api_base.clone(),
        config.stripe_secret_key.clone().unwrap_or_default(),
      )),
    };

    let mailer: Arc<dyn Mailer> = match config.email_backend {
      EmailBackend::Mock => Arc::new(MockMailer::new()),
      EmailBackend::Brevo => Arc::new(BrevoMailer::new(
        http.clone(),
        config.brevo_api_key.clone().unwrap_or_default(),
        config.email_sender.clone(),
      )),
    };

    let storage: Arc<dyn ObjectStorage> = match config.storage_backend {
      StorageBackend::Mock => Arc::new(MockStorage::new()),
      StorageBackend::Supabase => Arc::new(SupabaseStorage::new(
        http,
        config.supabase_url.clone().unwrap_or_default(),
        config.supabase_service_key.clone().unwrap_or_default(),
        config.storage_bucket.clone(),
      )),
    };

    Ok(Self::new(
      config,
      Collaborators {
        payments,
        orders,
        grants,
        issues,
        storage,
        mailer,
      },
    ))
  }
}
