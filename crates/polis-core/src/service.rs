//! The create path shared by new policies and submitted renewals.

use chrono::NaiveDate;
use tracing::info;

use crate::{
  Error, Result,
  duplicate::{DuplicateCheck, find_duplicate},
  policy::{NewPolicy, Policy, default_end_date},
  store::{PolicyInsert, PolicyStore},
  validate::{normalize_policy_number, validate_new_policy},
};

/// Validate, probe for duplicates, then insert.
///
/// A missing end date defaults to a one-year term from the start date, and a
/// missing start date to `today`. A duplicate reported by either the probe or
/// the store's constraint surfaces as [`Error::DuplicatePolicy`]; a failed
/// probe blocks the write.
pub async fn create_policy<S: PolicyStore>(
  store: &S,
  mut input: NewPolicy,
  today: NaiveDate,
) -> Result<Policy> {
  input.policy_number = normalize_policy_number(&input.policy_number);
  let start = *input.policy_start_date.get_or_insert(today);
  input.policy_end_date.get_or_insert_with(|| default_end_date(start));

  validate_new_policy(&input)?;

  let check = find_duplicate(store, input.user_id, &input.policy_number)
    .await
    .map_err(Error::store)?;
  if let DuplicateCheck::Exists { policy_type, policy_id, .. } = check {
    info!(%policy_id, %policy_type, "rejected duplicate policy number");
    return Err(Error::DuplicatePolicy { policy_type, policy_id });
  }

  match store.insert_policy(input).await.map_err(Error::store)? {
    PolicyInsert::Inserted(policy) => {
      info!(policy_id = %policy.id, policy_type = %policy.policy_type(), "policy created");
      Ok(policy)
    }
    PolicyInsert::Duplicate { policy_type, policy_id } => {
      info!(%policy_id, %policy_type, "store constraint rejected duplicate policy number");
      Err(Error::DuplicatePolicy { policy_type, policy_id })
    }
  }
}
