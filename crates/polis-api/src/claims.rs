//! Handlers for `/claims` and `/quotes` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/claims` | Claims visible to the caller, newest first |
//! | `POST`  | `/claims` | Body: [`ClaimBody`]; the policy must belong to the caller |
//! | `PATCH` | `/claims/:id/status` | Admin only; notifies the claimant |
//! | `GET`   | `/quotes` | Quote requests visible to the caller |
//! | `POST`  | `/quotes` | Body: [`QuoteBody`] |
//! | `PATCH` | `/quotes/:id/status` | Admin only |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use polis_core::{
  claim::{Claim, ClaimStatus, NewClaim, NewQuoteRequest, QuoteLine, QuoteRequest, QuoteStatus},
  error::FieldError,
  notification::{NewNotification, NotificationKind, NotificationMetadata},
  policy::DocumentRef,
  store::PolicyStore,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── Claims ──────────────────────────────────────────────────────────────────

/// `GET /claims`
pub async fn list<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Vec<Claim>>, ApiError> {
  let claims = state
    .store
    .list_claims(&user.scope())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(claims))
}

#[derive(Debug, Deserialize)]
pub struct ClaimBody {
  pub policy_id:     Uuid,
  pub incident_date: NaiveDate,
  pub description:   String,
  pub claim_amount:  Option<Decimal>,
  #[serde(default)]
  pub documents:     Vec<DocumentRef>,
}

/// `POST /claims` — returns 201 + the stored claim.
pub async fn create<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(body): Json<ClaimBody>,
) -> Result<impl IntoResponse, ApiError> {
  let policy = state.visible_policy(&user, body.policy_id).await?;
  if policy.user_id != user.id && !user.is_admin() {
    return Err(ApiError::Forbidden("claims can only be filed on your own policies".into()));
  }

  let mut errors = Vec::new();
  if body.description.trim().is_empty() {
    errors.push(FieldError::new("description", "describe what happened"));
  }
  if body.claim_amount.is_some_and(|a| a <= Decimal::ZERO) {
    errors.push(FieldError::new("claim_amount", "claim amount must be greater than zero"));
  }
  if body.incident_date > state.today() {
    errors.push(FieldError::new("incident_date", "incident date cannot be in the future"));
  }
  if !errors.is_empty() {
    return Err(ApiError::Validation(errors));
  }

  let claim = state
    .store
    .insert_claim(NewClaim {
      user_id:       policy.user_id,
      policy_id:     policy.id,
      incident_date: body.incident_date,
      description:   body.description.trim().to_owned(),
      claim_amount:  body.claim_amount,
      documents:     body.documents,
    })
    .await
    .map_err(ApiError::store)?;
  info!(claim_id = %claim.id, policy_id = %policy.id, "claim filed");
  Ok((StatusCode::CREATED, Json(claim)))
}

#[derive(Debug, Deserialize)]
pub struct ClaimStatusBody {
  pub status: ClaimStatus,
}

/// `PATCH /claims/:id/status` — admin only.
///
/// A change of status files a `claim_status_changed` notification for the
/// claimant and pushes it to their open streams.
pub async fn set_status<S: PolicyStore>(
  State(state): State<AppState<S>>,
  caller: Authenticated,
  Path(id): Path<Uuid>,
  Json(body): Json<ClaimStatusBody>,
) -> Result<Json<Claim>, ApiError> {
  caller.require_admin()?;

  let previous = state
    .store
    .get_claim(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("claim {id} not found")))?;

  let claim = state
    .store
    .set_claim_status(id, body.status)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("claim {id} not found")))?;

  if previous.status != claim.status {
    info!(claim_id = %id, from = %previous.status, to = %claim.status, "claim status changed");
    let notice = NewNotification {
      user_id:  claim.user_id,
      kind:     NotificationKind::ClaimStatusChanged,
      title:    "Claim status updated".to_owned(),
      message:  format!("Your claim is now {}.", claim.status),
      metadata: Some(NotificationMetadata {
        policy_id: Some(claim.policy_id),
        claim_id: Some(claim.id),
        ..Default::default()
      }),
    };
    // The status change stands even if the notice cannot be filed.
    match state.store.insert_notification(notice).await {
      Ok(n) => state.hub.inserted(n),
      Err(e) => warn!(error = %e, claim_id = %id, "failed to file claim notification"),
    }
  }

  Ok(Json(claim))
}

// ─── Quotes ──────────────────────────────────────────────────────────────────

/// `GET /quotes`
pub async fn list_quotes<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Vec<QuoteRequest>>, ApiError> {
  let quotes = state
    .store
    .list_quotes(&user.scope())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(quotes))
}

#[derive(Debug, Deserialize)]
pub struct QuoteBody {
  pub lob:       QuoteLine,
  #[serde(default)]
  pub details:   serde_json::Value,
  #[serde(default)]
  pub documents: Vec<DocumentRef>,
}

/// `POST /quotes` — returns 201 + the stored request.
pub async fn create_quote<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(body): Json<QuoteBody>,
) -> Result<impl IntoResponse, ApiError> {
  let quote = state
    .store
    .insert_quote(NewQuoteRequest {
      user_id:   user.id,
      lob:       body.lob,
      details:   body.details,
      documents: body.documents,
    })
    .await
    .map_err(ApiError::store)?;
  info!(quote_id = %quote.id, lob = %quote.lob, "quote requested");
  Ok((StatusCode::CREATED, Json(quote)))
}

#[derive(Debug, Deserialize)]
pub struct QuoteStatusBody {
  pub status: QuoteStatus,
}

/// `PATCH /quotes/:id/status` — admin only.
pub async fn set_quote_status<S: PolicyStore>(
  State(state): State<AppState<S>>,
  caller: Authenticated,
  Path(id): Path<Uuid>,
  Json(body): Json<QuoteStatusBody>,
) -> Result<Json<QuoteRequest>, ApiError> {
  caller.require_admin()?;
  let quote = state
    .store
    .set_quote_status(id, body.status)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("quote {id} not found")))?;
  Ok(Json(quote))
}
