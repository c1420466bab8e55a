//! Handlers for `/policies` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/policies` | Optional `?type`, `?status`; classified, newest first |
//! | `POST`   | `/policies` | Body: [`PolicyBody`]; 201, 409 on duplicate number, 422 on invalid input |
//! | `GET`    | `/policies/check-duplicate` | `?policy_number` (and `?user_id` for admins) |
//! | `GET`    | `/policies/:id` | 404 if not found or not visible |
//! | `PATCH`  | `/policies/:id` | Body: [`PolicyPatch`]; owner or admin |
//! | `DELETE` | `/policies/:id` | Admin only; 204 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use polis_core::{
  duplicate::{DuplicateCheck, DuplicateReport, find_duplicate},
  policy::{DocumentRef, NewPolicy, PolicyDetails, PolicyPatch, PolicyType},
  service::create_policy,
  status::{ClassifiedPolicy, PolicyStatus},
  store::PolicyStore,
  user::CurrentUser,
  validate::{normalize_policy_number, validate_date_range},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(rename = "type")]
  pub policy_type: Option<PolicyType>,
  pub status:      Option<PolicyStatus>,
}

/// `GET /policies[?type=<type>][&status=<status>]`
pub async fn list<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ClassifiedPolicy>>, ApiError> {
  let classifier = state.settings().await?.classifier();
  let policies = state
    .store
    .list_policies(&user.scope(), params.policy_type)
    .await
    .map_err(ApiError::store)?;

  let mut classified = classifier.classify_all(policies, state.today());
  if let Some(status) = params.status {
    classified.retain(|cp| cp.status == status);
  }
  Ok(Json(classified))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /policies/:id`
pub async fn get_one<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<ClassifiedPolicy>, ApiError> {
  let policy = state.visible_policy(&user, id).await?;
  let classifier = state.settings().await?.classifier();
  Ok(Json(classifier.classify_policy(policy, state.today())))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /policies`.
///
/// `user_id` defaults to the caller; only administrators may file a policy for
/// someone else. `company_name` defaults to the caller's company, and only
/// administrators may name a different one.
#[derive(Debug, Deserialize)]
pub struct PolicyBody {
  pub user_id:           Option<Uuid>,
  pub policy_number:     String,
  pub insurer:           String,
  pub premium_amount:    Decimal,
  pub policy_start_date: Option<NaiveDate>,
  #[serde(alias = "expiry_date")]
  pub policy_end_date:   Option<NaiveDate>,
  pub company_name:      Option<String>,
  #[serde(default)]
  pub documents:         Vec<DocumentRef>,
  pub details:           PolicyDetails,
}

impl PolicyBody {
  fn into_new_policy(self, caller: &CurrentUser) -> Result<NewPolicy, ApiError> {
    let user_id = owner_for(caller, self.user_id)?;
    let company_name = match company_for(caller, self.company_name)? {
      Some(company) => Some(company),
      None if user_id == caller.id => caller.company_name.clone(),
      None => None,
    };
    Ok(NewPolicy {
      user_id,
      policy_number: self.policy_number,
      insurer: self.insurer,
      premium_amount: self.premium_amount,
      policy_start_date: self.policy_start_date,
      policy_end_date: self.policy_end_date,
      company_name,
      documents: self.documents,
      renewed_from_policy_id: None,
      previous_policy_number: None,
      details: self.details,
    })
  }
}

/// The customer a request acts on: the caller, unless an administrator names
/// someone else.
fn owner_for(caller: &CurrentUser, requested: Option<Uuid>) -> Result<Uuid, ApiError> {
  match requested {
    Some(id) if id != caller.id && !caller.is_admin() => Err(ApiError::Forbidden(
      "cannot act on another customer's policies".into(),
    )),
    Some(id) => Ok(id),
    None => Ok(caller.id),
  }
}

/// The company a policy is pooled under. Non-administrators can only name
/// their own.
fn company_for(
  caller: &CurrentUser,
  requested: Option<String>,
) -> Result<Option<String>, ApiError> {
  match requested {
    Some(company) if !caller.is_admin() && caller.company_name.as_ref() != Some(&company) => Err(
      ApiError::Forbidden("cannot file policies under another company".into()),
    ),
    requested => Ok(requested),
  }
}

/// `POST /policies` — returns 201 + the stored policy, classified.
pub async fn create<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(body): Json<PolicyBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = body.into_new_policy(&user)?;
  let today = state.today();
  let policy = create_policy(state.store.as_ref(), input, today).await?;
  let classifier = state.settings().await?.classifier();
  Ok((StatusCode::CREATED, Json(classifier.classify_policy(policy, today))))
}

// ─── Duplicate probe ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DuplicateParams {
  pub policy_number: String,
  pub user_id:       Option<Uuid>,
}

/// `GET /policies/check-duplicate?policy_number=...[&user_id=...]`
///
/// The fast pre-submit probe. The create path repeats it and the store
/// enforces uniqueness regardless.
pub async fn check_duplicate<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Query(params): Query<DuplicateParams>,
) -> Result<Json<DuplicateReport>, ApiError> {
  let owner = owner_for(&user, params.user_id)?;
  let check = find_duplicate(state.store.as_ref(), owner, &params.policy_number)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(check.into()))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /policies/:id` — owner or admin.
pub async fn update<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<Uuid>,
  Json(mut patch): Json<PolicyPatch>,
) -> Result<Json<ClassifiedPolicy>, ApiError> {
  let current = state.visible_policy(&user, id).await?;
  if current.user_id != user.id && !user.is_admin() {
    return Err(ApiError::Forbidden("only the owner may edit this policy".into()));
  }

  if let Some(details) = &patch.details
    && details.policy_type() != current.policy_type()
  {
    return Err(ApiError::field("details", "the product line cannot be changed"));
  }
  patch.company_name = company_for(&user, patch.company_name.take())?;

  if let Some(number) = patch.policy_number.as_mut() {
    *number = normalize_policy_number(number);
    if number.is_empty() {
      return Err(ApiError::field("policy_number", "policy number is required"));
    }
    if let DuplicateCheck::Exists { policy_type, policy_id, .. } =
      find_duplicate(state.store.as_ref(), current.user_id, number)
        .await
        .map_err(ApiError::store)?
      && policy_id != id
    {
      return Err(ApiError::DuplicatePolicy { policy_type, policy_id });
    }
  }

  if let Some(premium) = patch.premium_amount
    && premium <= Decimal::ZERO
  {
    return Err(ApiError::field("premium_amount", "premium must be greater than zero"));
  }

  validate_date_range(
    patch.policy_start_date.or(current.policy_start_date),
    patch.policy_end_date.or(current.policy_end_date),
  )
  .map_err(|_| ApiError::field("policy_end_date", "end date cannot be before start date"))?;

  let updated = state
    .store
    .update_policy(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("policy {id} not found")))?;
  info!(policy_id = %id, "policy updated");

  let classifier = state.settings().await?.classifier();
  Ok(Json(classifier.classify_policy(updated, state.today())))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /policies/:id` — admin only.
pub async fn delete_one<S: PolicyStore>(
  State(state): State<AppState<S>>,
  caller: Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  caller.require_admin()?;
  if state.store.delete_policy(id).await.map_err(ApiError::store)? {
    info!(policy_id = %id, "policy deleted");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("policy {id} not found")))
  }
}
