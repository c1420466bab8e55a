//! Error types for `polis-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{policy::PolicyType, status::PolicyStatus};

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   &'static str,
  pub message: String,
}

impl FieldError {
  pub fn new(field: &'static str, message: impl Into<String>) -> Self {
    Self { field, message: message.into() }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed on {} field(s)", .0.len())]
  Validation(Vec<FieldError>),

  #[error("policy number already registered as {policy_type} policy {policy_id}")]
  DuplicatePolicy {
    policy_type: PolicyType,
    policy_id:   Uuid,
  },

  #[error("policy {policy_id} is {status} and cannot be renewed")]
  NotRenewable {
    policy_id: Uuid,
    status:    PolicyStatus,
  },

  #[error("a renewal must use a new policy number")]
  PolicyNumberReused,

  #[error("renewal already submitted as policy {policy_id}")]
  RenewalAlreadySubmitted { policy_id: Uuid },

  #[error("policy not found: {0}")]
  PolicyNotFound(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Box a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
