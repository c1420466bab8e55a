//! Server assembly for Polis: configuration, first-start bootstrap and the
//! top-level router.

use std::path::PathBuf;

use axum::Router;
use polis_api::{AppState, api_router};
use polis_core::{
  settings::{Grouping, SystemSettings},
  status::DEFAULT_THRESHOLD_DAYS,
  store::PolicyStore,
  user::{NewUser, Role},
};
use polis_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::{info, warn};

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_threshold() -> u32 { DEFAULT_THRESHOLD_DAYS }

fn default_currency() -> String { "₹".to_owned() }

/// Runtime server configuration, deserialised from `config.toml` and
/// `POLIS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Administrator created on first start, if no account has this email.
  pub admin_email:           Option<String>,
  /// argon2 PHC string; see `--hash-password`.
  pub admin_password_hash:   Option<String>,
  /// Seeds the stored settings on first start only.
  #[serde(default = "default_threshold")]
  pub expiry_threshold_days: u32,
  #[serde(default = "default_currency")]
  pub currency_symbol:       String,
}

impl ServerConfig {
  pub fn initial_settings(&self) -> SystemSettings {
    SystemSettings {
      expiry_threshold_days: self.expiry_threshold_days,
      currency_symbol:       self.currency_symbol.clone(),
      grouping:              Grouping::default(),
    }
  }
}

// ─── Bootstrap ────────────────────────────────────────────────────────────────

/// Seed settings and the administrator account on a fresh store. Existing
/// settings and accounts are left alone.
pub async fn bootstrap(
  store: &SqliteStore,
  config: &ServerConfig,
) -> polis_store_sqlite::Result<()> {
  if !store.has_settings().await? {
    let settings = config.initial_settings();
    info!(threshold = settings.expiry_threshold_days, "seeding system settings");
    store.put_settings(settings).await?;
  }

  match (&config.admin_email, &config.admin_password_hash) {
    (Some(email), Some(hash)) => {
      if store.find_user_by_email(email).await?.is_none() {
        let account = store
          .add_user(NewUser {
            email:         email.clone(),
            role:          Role::Admin,
            company_name:  None,
            password_hash: hash.clone(),
          })
          .await?;
        info!(user_id = %account.user.id, %email, "administrator account created");
      }
    }
    _ => warn!("no administrator configured; set admin_email and admin_password_hash"),
  }
  Ok(())
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api`.
pub fn app(state: AppState<SqliteStore>) -> Router {
  Router::new().nest("/api", api_router(state))
}
