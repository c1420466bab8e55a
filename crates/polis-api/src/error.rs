//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use polis_core::{error::FieldError, policy::PolicyType};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("policy number already registered as {policy_type} policy {policy_id}")]
  DuplicatePolicy {
    policy_type: PolicyType,
    policy_id:   Uuid,
  },

  #[error("validation failed")]
  Validation(Vec<FieldError>),

  #[error("export error: {0}")]
  Export(polis_export::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn field(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation(vec![FieldError::new(field, message)])
  }
}

impl From<polis_core::Error> for ApiError {
  fn from(e: polis_core::Error) -> Self {
    use polis_core::Error as E;
    match e {
      E::Validation(fields) => Self::Validation(fields),
      E::DuplicatePolicy { policy_type, policy_id } => {
        Self::DuplicatePolicy { policy_type, policy_id }
      }
      e @ (E::NotRenewable { .. } | E::RenewalAlreadySubmitted { .. }) => {
        Self::Conflict(e.to_string())
      }
      E::PolicyNumberReused => Self::field(
        "policy_number",
        "a renewal must use a new policy number",
      ),
      E::PolicyNotFound(id) => Self::NotFound(format!("policy {id} not found")),
      E::Store(e) => Self::Store(e),
      e @ E::Serialization(_) => Self::Store(Box::new(e)),
    }
  }
}

impl From<polis_export::Error> for ApiError {
  fn from(e: polis_export::Error) -> Self { Self::Export(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"polis\""),
        );
        return res;
      }
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "error": m })),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::DuplicatePolicy { policy_type, policy_id } => (
        StatusCode::CONFLICT,
        json!({
          "error": self.to_string(),
          "policy_type": policy_type,
          "policy_id": policy_id,
        }),
      ),
      ApiError::Validation(fields) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": "validation failed", "fields": fields }),
      ),
      ApiError::Export(polis_export::Error::EmptyReport) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": "no policies match the export filters" }),
      ),
      ApiError::Export(e) => {
        error!(error = %e, "export failed");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
      ApiError::Store(e) => {
        error!(error = %e, "store operation failed");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
