//! Handlers for `/notifications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notifications` | The caller's notifications, newest first |
//! | `POST` | `/notifications/:id/read` | Idempotent; pushes an `updated` event |
//! | `POST` | `/notifications/expiry-scan` | Files owed expiry reminders for visible policies |
//! | `GET`  | `/notifications/stream` | Server-sent events: `inserted` / `updated` |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use polis_core::{
  notification::{Notification, PushEvent, expiry_notifications},
  status::ClassifiedPolicy,
  store::PolicyStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `GET /notifications`
pub async fn list<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Vec<Notification>>, ApiError> {
  let items = state
    .store
    .list_notifications(user.id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `POST /notifications/:id/read`
pub async fn mark_read<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
  let notification = state
    .store
    .mark_notification_read(user.id, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("notification {id} not found")))?;
  state.hub.updated(notification.clone());
  Ok(Json(notification))
}

/// `POST /notifications/expiry-scan`
///
/// Reminders are filed for each policy owner against that owner's existing
/// notifications, so rerunning the scan on the same day files nothing new.
pub async fn expiry_scan<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Vec<Notification>>, ApiError> {
  let today = state.today();
  let classifier = state.settings().await?.classifier();
  let policies = state
    .store
    .list_policies(&user.scope(), None)
    .await
    .map_err(ApiError::store)?;

  let mut by_owner: BTreeMap<Uuid, Vec<ClassifiedPolicy>> = BTreeMap::new();
  for cp in classifier.classify_all(policies, today) {
    by_owner.entry(cp.policy.user_id).or_default().push(cp);
  }

  let mut filed = Vec::new();
  for (owner, owned) in by_owner {
    let existing = state
      .store
      .list_notifications(owner)
      .await
      .map_err(ApiError::store)?;
    for input in expiry_notifications(&owned, today, &existing) {
      let n = state
        .store
        .insert_notification(input)
        .await
        .map_err(ApiError::store)?;
      state.hub.inserted(n.clone());
      filed.push(n);
    }
  }

  info!(filed = filed.len(), "expiry scan finished");
  Ok(Json(filed))
}

/// `GET /notifications/stream`
pub async fn stream<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
  let subscription = state.hub.subscribe(user.id);
  let events = futures::stream::unfold(subscription, |mut sub| async move {
    let event = sub.recv().await?;
    let name = match &event {
      PushEvent::Inserted(_) => "inserted",
      PushEvent::Updated(_) => "updated",
    };
    Some((Event::default().event(name).json_data(&event), sub))
  });
  Sse::new(events).keep_alive(KeepAlive::default())
}
