//! Loading a classified portfolio snapshot for dashboards and reports.
//!
//! Reads that feed aggregation degrade to empty collections on failure: a
//! broken claims query must not take the whole dashboard down with it. The
//! failure is logged and the affected figures show zero.

use chrono::NaiveDate;
use tracing::warn;

use crate::{
  claim::Claim,
  notification::Notification,
  policy::PolicyType,
  status::{ClassifiedPolicy, Classifier},
  store::PolicyStore,
  user::{CurrentUser, Scope},
};

/// Everything visible to one caller, classified as of `as_of`.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
  pub as_of:          NaiveDate,
  pub threshold_days: u32,
  pub policies:       Vec<ClassifiedPolicy>,
  pub claims:         Vec<Claim>,
  pub notifications:  Vec<Notification>,
}

fn or_empty<T, E: std::fmt::Display>(what: &'static str, res: Result<Vec<T>, E>) -> Vec<T> {
  res.unwrap_or_else(|e| {
    warn!(error = %e, "failed to load {what}; continuing with none");
    Vec::new()
  })
}

/// Fetch policies, claims and the caller's notifications concurrently, then
/// classify the policies.
pub async fn load_snapshot<S: PolicyStore>(
  store: &S,
  user: &CurrentUser,
  scope: &Scope,
  policy_type: Option<PolicyType>,
  classifier: Classifier,
  as_of: NaiveDate,
) -> PortfolioSnapshot {
  let (policies, claims, notifications) = futures::join!(
    store.list_policies(scope, policy_type),
    store.list_claims(scope),
    store.list_notifications(user.id),
  );

  PortfolioSnapshot {
    as_of,
    threshold_days: classifier.threshold_days(),
    policies: classifier.classify_all(or_empty("policies", policies), as_of),
    claims: or_empty("claims", claims),
    notifications: or_empty("notifications", notifications),
  }
}

impl PortfolioSnapshot {
  pub fn summary(&self) -> crate::aggregate::DashboardSummary {
    crate::aggregate::DashboardSummary::compute(
      self.as_of,
      self.threshold_days,
      &self.policies,
      &self.claims,
      &self.notifications,
    )
  }
}
