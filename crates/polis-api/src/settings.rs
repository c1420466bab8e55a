//! Handlers for system settings and account administration.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/settings` | Any authenticated caller |
//! | `PUT`  | `/settings` | Admin only; takes effect on the next classification |
//! | `POST` | `/admin/users` | Admin only; body: [`NewUserBody`]; 409 if the email is taken |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use polis_core::{
  error::FieldError,
  settings::SystemSettings,
  store::PolicyStore,
  user::{NewUser, Role},
};
use serde::Deserialize;
use tracing::info;

use crate::{
  AppState,
  auth::{Authenticated, hash_password},
  error::ApiError,
};

/// Longest accepted Expiring Soon window.
pub const MAX_THRESHOLD_DAYS: u32 = 365;

/// `GET /settings`
pub async fn get<S: PolicyStore>(
  State(state): State<AppState<S>>,
  _caller: Authenticated,
) -> Result<Json<SystemSettings>, ApiError> {
  Ok(Json(state.settings().await?))
}

/// `PUT /settings` — admin only.
pub async fn put<S: PolicyStore>(
  State(state): State<AppState<S>>,
  caller: Authenticated,
  Json(body): Json<SystemSettings>,
) -> Result<Json<SystemSettings>, ApiError> {
  caller.require_admin()?;

  let mut errors = Vec::new();
  if !(1..=MAX_THRESHOLD_DAYS).contains(&body.expiry_threshold_days) {
    errors.push(FieldError::new(
      "expiry_threshold_days",
      format!("must be between 1 and {MAX_THRESHOLD_DAYS}"),
    ));
  }
  if body.currency_symbol.trim().is_empty() {
    errors.push(FieldError::new("currency_symbol", "currency symbol is required"));
  }
  if !errors.is_empty() {
    return Err(ApiError::Validation(errors));
  }

  state
    .store
    .put_settings(body.clone())
    .await
    .map_err(ApiError::store)?;
  info!(threshold = body.expiry_threshold_days, "settings updated");
  Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct NewUserBody {
  pub email:        String,
  pub password:     String,
  pub role:         Role,
  pub company_name: Option<String>,
}

/// `POST /admin/users` — admin only; returns 201 + the account.
pub async fn create_user<S: PolicyStore>(
  State(state): State<AppState<S>>,
  caller: Authenticated,
  Json(body): Json<NewUserBody>,
) -> Result<impl IntoResponse, ApiError> {
  caller.require_admin()?;

  let email = body.email.trim().to_owned();
  let mut errors = Vec::new();
  if !email.contains('@') {
    errors.push(FieldError::new("email", "a valid email address is required"));
  }
  if body.password.len() < 8 {
    errors.push(FieldError::new("password", "password must be at least 8 characters"));
  }
  if body.role == Role::CorporateAdmin && body.company_name.is_none() {
    errors.push(FieldError::new("company_name", "corporate administrators need a company"));
  }
  if !errors.is_empty() {
    return Err(ApiError::Validation(errors));
  }

  if state
    .store
    .find_user_by_email(&email)
    .await
    .map_err(ApiError::store)?
    .is_some()
  {
    return Err(ApiError::Conflict(format!("email {email:?} is already registered")));
  }

  let password_hash = hash_password(&body.password)
    .map_err(|e| ApiError::BadRequest(format!("cannot hash password: {e}")))?;
  let account = state
    .store
    .add_user(NewUser {
      email,
      role: body.role,
      company_name: body.company_name,
      password_hash,
    })
    .await
    .map_err(ApiError::store)?;
  info!(user_id = %account.user.id, role = ?account.user.role, "account created");
  Ok((StatusCode::CREATED, Json(account)))
}
