//! JSON REST API for Polis.
//!
//! Exposes an axum [`Router`] backed by any [`polis_core::store::PolicyStore`].
//! Every route requires HTTP Basic credentials for a stored account; TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", polis_api::api_router(AppState::new(store)))
//! ```

pub mod auth;
pub mod claims;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod hub;
pub mod notifications;
pub mod policies;
pub mod renewals;
pub mod settings;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use chrono::{Local, NaiveDate};
use polis_core::{
  policy::Policy,
  settings::SystemSettings,
  store::PolicyStore,
  user::CurrentUser,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use error::ApiError;
pub use hub::NotificationHub;

// ─── Application state ────────────────────────────────────────────────────────

/// Source of "today" for every classification.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
  /// The server's local calendar date.
  #[default]
  System,
  Fixed(NaiveDate),
}

impl Clock {
  pub fn today(self) -> NaiveDate {
    match self {
      Self::System => Local::now().date_naive(),
      Self::Fixed(d) => d,
    }
  }
}

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub hub:   NotificationHub,
  pub clock: Clock,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      hub:   self.hub.clone(),
      clock: self.clock,
    }
  }
}

impl<S: PolicyStore> AppState<S> {
  pub fn new(store: S) -> Self {
    Self {
      store: Arc::new(store),
      hub:   NotificationHub::default(),
      clock: Clock::System,
    }
  }

  pub fn with_clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  pub fn today(&self) -> NaiveDate { self.clock.today() }

  pub(crate) async fn settings(&self) -> Result<SystemSettings, ApiError> {
    self.store.get_settings().await.map_err(ApiError::store)
  }

  /// Fetch a policy the caller may read. Policies outside the caller's scope
  /// are reported as missing.
  pub(crate) async fn visible_policy(
    &self,
    user: &CurrentUser,
    id: Uuid,
  ) -> Result<Policy, ApiError> {
    self
      .store
      .get_policy(id)
      .await
      .map_err(ApiError::store)?
      .filter(|p| user.can_read(p.user_id, p.company_name.as_deref()))
      .ok_or_else(|| ApiError::NotFound(format!("policy {id} not found")))
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: PolicyStore + 'static,
{
  Router::new()
    // Policies
    .route("/policies", get(policies::list::<S>).post(policies::create::<S>))
    .route("/policies/check-duplicate", get(policies::check_duplicate::<S>))
    .route(
      "/policies/{id}",
      get(policies::get_one::<S>)
        .patch(policies::update::<S>)
        .delete(policies::delete_one::<S>),
    )
    // Renewals
    .route("/policies/{id}/renewal", post(renewals::initiate::<S>))
    .route("/renewals", post(renewals::submit::<S>))
    // Dashboard
    .route("/dashboard", get(dashboard::summary::<S>))
    .route("/dashboard/trends", get(dashboard::trends::<S>))
    .route("/dashboard/breakdown", get(dashboard::breakdown::<S>))
    // Export
    .route("/export", get(export::handler::<S>))
    // Claims and quotes
    .route("/claims", get(claims::list::<S>).post(claims::create::<S>))
    .route("/claims/{id}/status", patch(claims::set_status::<S>))
    .route("/quotes", get(claims::list_quotes::<S>).post(claims::create_quote::<S>))
    .route("/quotes/{id}/status", patch(claims::set_quote_status::<S>))
    // Notifications
    .route("/notifications", get(notifications::list::<S>))
    .route("/notifications/stream", get(notifications::stream::<S>))
    .route("/notifications/expiry-scan", post(notifications::expiry_scan::<S>))
    .route("/notifications/{id}/read", post(notifications::mark_read::<S>))
    // Settings and accounts
    .route("/settings", get(settings::get::<S>).put(settings::put::<S>))
    .route("/admin/users", post(settings::create_user::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
