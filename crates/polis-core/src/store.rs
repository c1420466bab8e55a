//! The `PolicyStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `polis-store-sqlite`).
//! Higher layers (`polis-api`) depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  claim::{Claim, ClaimStatus, NewClaim, NewQuoteRequest, QuoteRequest, QuoteStatus},
  notification::{NewNotification, Notification},
  policy::{NewPolicy, Policy, PolicyPatch, PolicyType},
  settings::SystemSettings,
  user::{NewUser, Scope, UserAccount},
};

/// Outcome of [`PolicyStore::insert_policy`].
///
/// `Duplicate` is the storage layer's own uniqueness guard firing: another
/// policy for the same customer already holds the number, regardless of
/// product line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PolicyInsert {
  Inserted(Policy),
  Duplicate {
    policy_type: PolicyType,
    policy_id:   Uuid,
  },
}

/// Abstraction over a policy store backend.
///
/// Every list method returns records newest first by `created_at`.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait PolicyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Policies ──────────────────────────────────────────────────────────

  /// Persist a new policy, assigning `id`, `created_at` and `updated_at`.
  ///
  /// Must enforce `(user_id, policy_number)` uniqueness across all product
  /// lines atomically with the insert.
  fn insert_policy(
    &self,
    input: NewPolicy,
  ) -> impl Future<Output = Result<PolicyInsert, Self::Error>> + Send + '_;

  /// Retrieve a policy by id. Returns `None` if not found.
  fn get_policy(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Policy>, Self::Error>> + Send + '_;

  /// Probe one product line's collection for a customer's policy number.
  fn find_policy_by_number<'a>(
    &'a self,
    user_id: Uuid,
    policy_type: PolicyType,
    policy_number: &'a str,
  ) -> impl Future<Output = Result<Option<Policy>, Self::Error>> + Send + 'a;

  /// The policy created as a renewal of `source_id`, if any.
  fn find_renewal_of(
    &self,
    source_id: Uuid,
  ) -> impl Future<Output = Result<Option<Policy>, Self::Error>> + Send + '_;

  /// List policies visible in `scope`, optionally restricted to one line.
  fn list_policies<'a>(
    &'a self,
    scope: &'a Scope,
    policy_type: Option<PolicyType>,
  ) -> impl Future<Output = Result<Vec<Policy>, Self::Error>> + Send + 'a;

  /// Apply a partial update. Returns `None` if the policy does not exist.
  fn update_policy(
    &self,
    id: Uuid,
    patch: PolicyPatch,
  ) -> impl Future<Output = Result<Option<Policy>, Self::Error>> + Send + '_;

  /// Delete a policy. Returns `false` if it did not exist.
  fn delete_policy(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Claims ────────────────────────────────────────────────────────────

  fn insert_claim(
    &self,
    input: NewClaim,
  ) -> impl Future<Output = Result<Claim, Self::Error>> + Send + '_;

  fn get_claim(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Claim>, Self::Error>> + Send + '_;

  fn list_claims<'a>(
    &'a self,
    scope: &'a Scope,
  ) -> impl Future<Output = Result<Vec<Claim>, Self::Error>> + Send + 'a;

  fn set_claim_status(
    &self,
    id: Uuid,
    status: ClaimStatus,
  ) -> impl Future<Output = Result<Option<Claim>, Self::Error>> + Send + '_;

  // ── Quote requests ────────────────────────────────────────────────────

  fn insert_quote(
    &self,
    input: NewQuoteRequest,
  ) -> impl Future<Output = Result<QuoteRequest, Self::Error>> + Send + '_;

  fn list_quotes<'a>(
    &'a self,
    scope: &'a Scope,
  ) -> impl Future<Output = Result<Vec<QuoteRequest>, Self::Error>> + Send + 'a;

  fn set_quote_status(
    &self,
    id: Uuid,
    status: QuoteStatus,
  ) -> impl Future<Output = Result<Option<QuoteRequest>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn insert_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  fn list_notifications(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Mark a notification read. Returns `None` if it does not belong to
  /// `user_id` or does not exist. Marking twice is a no-op.
  fn mark_notification_read(
    &self,
    user_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserAccount, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + 'a;

  // ── Settings ──────────────────────────────────────────────────────────

  /// Current settings; defaults when none have been saved.
  fn get_settings(
    &self,
  ) -> impl Future<Output = Result<SystemSettings, Self::Error>> + Send + '_;

  fn put_settings(
    &self,
    settings: SystemSettings,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
