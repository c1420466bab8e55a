//! Cross-line duplicate detection for policy numbers.
//!
//! A customer's policy number must be unique across all six product lines
//! combined. This probe is the fast, user-facing check; the store's own
//! uniqueness constraint is the authoritative guard, since another write can
//! land between the probe and the insert.

use serde::Serialize;
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::{
  policy::{Policy, PolicyType},
  store::PolicyStore,
  validate::normalize_policy_number,
};

/// Result of [`find_duplicate`].
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateCheck {
  Unique,
  Exists {
    policy_type: PolicyType,
    policy_id:   Uuid,
    policy:      Box<Policy>,
  },
}

impl DuplicateCheck {
  pub fn exists(&self) -> bool { matches!(self, Self::Exists { .. }) }
}

/// Wire shape: `{"exists": false}` or `{"exists": true, "policy_type": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
  pub exists:      bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub policy_type: Option<PolicyType>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub policy_id:   Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub policy:      Option<Box<Policy>>,
}

impl From<DuplicateCheck> for DuplicateReport {
  fn from(check: DuplicateCheck) -> Self {
    match check {
      DuplicateCheck::Unique => Self {
        exists:      false,
        policy_type: None,
        policy_id:   None,
        policy:      None,
      },
      DuplicateCheck::Exists { policy_type, policy_id, policy } => Self {
        exists:      true,
        policy_type: Some(policy_type),
        policy_id:   Some(policy_id),
        policy:      Some(policy),
      },
    }
  }
}

/// Probe every product line, in [`PolicyType`] order, for `policy_number`
/// owned by `user_id`. Returns on the first hit.
///
/// A storage failure is returned as an error, never as "unique": callers must
/// not insert when the probe could not run.
pub async fn find_duplicate<S: PolicyStore>(
  store: &S,
  user_id: Uuid,
  policy_number: &str,
) -> Result<DuplicateCheck, S::Error> {
  let number = normalize_policy_number(policy_number);
  for policy_type in PolicyType::iter() {
    if let Some(policy) = store
      .find_policy_by_number(user_id, policy_type, &number)
      .await?
    {
      return Ok(DuplicateCheck::Exists {
        policy_type,
        policy_id: policy.id,
        policy: Box::new(policy),
      });
    }
  }
  Ok(DuplicateCheck::Unique)
}
