//! Handlers for the renewal workflow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/policies/:id/renewal` | Returns a prefilled [`RenewalDraft`]; 409 if the policy is still Active |
//! | `POST` | `/renewals` | Body: the draft with a new `policy_number`; 201 + [`SubmittedRenewal`] |
//!
//! Drafts live on the client between the two calls. Nothing is written until
//! submission, so abandoning a draft needs no request.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use polis_core::{
  renewal::RenewalDraft,
  status::ClassifiedPolicy,
  store::PolicyStore,
  user::CurrentUser,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

async fn renewable_source<S: PolicyStore>(
  state: &AppState<S>,
  user: &CurrentUser,
  id: Uuid,
) -> Result<ClassifiedPolicy, ApiError> {
  let source = state.visible_policy(user, id).await?;
  if source.user_id != user.id && !user.is_admin() {
    return Err(ApiError::Forbidden("only the owner may renew this policy".into()));
  }
  let classifier = state.settings().await?.classifier();
  Ok(classifier.classify_policy(source, state.today()))
}

/// `POST /policies/:id/renewal`
pub async fn initiate<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<RenewalDraft>, ApiError> {
  let source = renewable_source(&state, &user, id).await?;
  Ok(Json(RenewalDraft::initiate(&source, state.today())?))
}

#[derive(Debug, Serialize)]
pub struct SubmittedRenewal {
  pub draft:  RenewalDraft,
  pub policy: ClassifiedPolicy,
}

/// `POST /renewals`
///
/// The source is re-read and re-classified: it must still exist, belong to
/// the caller, be renewable and not have been renewed already. Lineage,
/// ownership and company are taken from the source, not from the submitted
/// body, and the product line must match the source's.
pub async fn submit<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(mut draft): Json<RenewalDraft>,
) -> Result<impl IntoResponse, ApiError> {
  let source = renewable_source(&state, &user, draft.source_id).await?;
  let today = state.today();
  let lineage = RenewalDraft::initiate(&source, today)?.policy;

  if draft.policy.details.policy_type() != lineage.details.policy_type() {
    return Err(ApiError::field("details", "a renewal must keep the source's product line"));
  }

  draft.policy.user_id = lineage.user_id;
  draft.policy.company_name = lineage.company_name;
  draft.policy.renewed_from_policy_id = lineage.renewed_from_policy_id;
  draft.policy.previous_policy_number = lineage.previous_policy_number;

  let created = draft.submit(state.store.as_ref(), today).await?;
  let classifier = state.settings().await?.classifier();
  Ok((
    StatusCode::CREATED,
    Json(SubmittedRenewal { draft, policy: classifier.classify_policy(created, today) }),
  ))
}
