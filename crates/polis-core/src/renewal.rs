//! Renewal drafts.
//!
//! A renewal never mutates its source. It produces a new policy carrying a
//! back-reference (`renewed_from_policy_id`, `previous_policy_number`) to the
//! policy it replaces:
//!
//! ```text
//! source (Expiring Soon | Expired) ──initiate──▶ DraftPrefilled ──submit──▶ Submitted
//!                                                      │
//!                                                      └──cancel──▶ (discarded)
//! ```
//!
//! A failed submission leaves the draft in `DraftPrefilled` so it can be
//! corrected and retried.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  policy::{NewPolicy, Policy, default_end_date},
  service::create_policy,
  status::ClassifiedPolicy,
  store::PolicyStore,
  validate::normalize_policy_number,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenewalState {
  DraftPrefilled,
  Submitted { policy_id: Uuid },
}

/// A prefilled renewal awaiting a new policy number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalDraft {
  pub source_id: Uuid,
  pub state:     RenewalState,
  pub policy:    NewPolicy,
}

impl RenewalDraft {
  /// Prefill a renewal of `source`, starting `today`.
  ///
  /// Every field is copied except the policy number (cleared) and the term
  /// (a fresh one-year term from `today`). Only documents that describe the
  /// insured object rather than the old term are carried forward.
  pub fn initiate(source: &ClassifiedPolicy, today: NaiveDate) -> Result<Self> {
    let src = &source.policy;
    if !source.status.is_renewable() {
      return Err(Error::NotRenewable { policy_id: src.id, status: source.status });
    }

    let policy = NewPolicy {
      user_id:                src.user_id,
      policy_number:          String::new(),
      insurer:                src.insurer.clone(),
      premium_amount:         src.premium_amount,
      policy_start_date:      Some(today),
      policy_end_date:        Some(default_end_date(today)),
      company_name:           src.company_name.clone(),
      documents:              src
        .documents
        .iter()
        .filter(|d| d.kind.is_reusable())
        .cloned()
        .collect(),
      renewed_from_policy_id: Some(src.id),
      previous_policy_number: Some(src.policy_number.clone()),
      details:                src.details.clone(),
    };

    info!(source_id = %src.id, status = %source.status, "renewal draft prefilled");
    Ok(Self { source_id: src.id, state: RenewalState::DraftPrefilled, policy })
  }

  pub fn set_policy_number(&mut self, number: impl Into<String>) {
    self.policy.policy_number = number.into();
  }

  /// Whether the entered number matches the source's, ignoring surrounding
  /// whitespace and case.
  pub fn reuses_previous_number(&self) -> bool {
    let entered = normalize_policy_number(&self.policy.policy_number);
    self
      .policy
      .previous_policy_number
      .as_deref()
      .is_some_and(|prev| normalize_policy_number(prev).eq_ignore_ascii_case(&entered))
  }

  /// Submit through the regular create path.
  ///
  /// On success the draft moves to [`RenewalState::Submitted`]. On failure it
  /// is left untouched. The source policy is never modified, and it can be
  /// renewed only once.
  pub async fn submit<S: PolicyStore>(&mut self, store: &S, today: NaiveDate) -> Result<Policy> {
    if let RenewalState::Submitted { policy_id } = self.state {
      return Err(Error::RenewalAlreadySubmitted { policy_id });
    }
    if self.reuses_previous_number() {
      return Err(Error::PolicyNumberReused);
    }
    if let Some(existing) = store.find_renewal_of(self.source_id).await.map_err(Error::store)? {
      info!(source_id = %self.source_id, policy_id = %existing.id, "source already renewed");
      return Err(Error::RenewalAlreadySubmitted { policy_id: existing.id });
    }

    let created = create_policy(store, self.policy.clone(), today).await?;
    info!(source_id = %self.source_id, policy_id = %created.id, "renewal submitted");
    self.state = RenewalState::Submitted { policy_id: created.id };
    Ok(created)
  }

  /// Discard the draft. Nothing was written, so there is nothing to undo.
  pub fn cancel(self) {
    info!(source_id = %self.source_id, "renewal draft discarded");
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use rust_decimal::Decimal;

  use super::*;
  use crate::{
    policy::{Bucket, DocumentKind, DocumentRef, MotorDetails, PolicyDetails},
    status::{Classifier, PolicyStatus},
  };

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn source(end: NaiveDate) -> Policy {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    Policy {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      policy_number: "MOT-2024-001".into(),
      insurer: "Bajaj Allianz".into(),
      premium_amount: Decimal::from(14_250),
      policy_start_date: Some(date(2024, 6, 1)),
      policy_end_date: Some(end),
      company_name: Some("Acme".into()),
      documents: vec![
        DocumentRef {
          bucket: Bucket::RcCopies,
          url:    "https://files.example/rc.pdf".into(),
          kind:   DocumentKind::RegistrationCertificate,
        },
        DocumentRef {
          bucket: Bucket::PolicyDocuments,
          url:    "https://files.example/policy-2024.pdf".into(),
          kind:   DocumentKind::PolicyCopy,
        },
      ],
      renewed_from_policy_id: None,
      previous_policy_number: None,
      created_at: at,
      updated_at: at,
      details: PolicyDetails::Motor(MotorDetails {
        vehicle_number: "MH12AB1234".into(),
        vehicle_type: Some("Car".into()),
        ..Default::default()
      }),
    }
  }

  #[test]
  fn active_policy_is_not_renewable() {
    let today = date(2025, 1, 1);
    let cp = Classifier::default().classify_policy(source(date(2025, 5, 31)), today);
    assert_eq!(cp.status, PolicyStatus::Active);
    assert!(matches!(RenewalDraft::initiate(&cp, today), Err(Error::NotRenewable { .. })));
  }

  #[test]
  fn draft_copies_all_but_number_and_term() {
    let today = date(2025, 5, 25);
    let src = source(date(2025, 5, 31));
    let cp = Classifier::default().classify_policy(src.clone(), today);
    let draft = RenewalDraft::initiate(&cp, today).unwrap();

    assert_eq!(draft.state, RenewalState::DraftPrefilled);
    assert_eq!(draft.source_id, src.id);
    let p = &draft.policy;
    assert!(p.policy_number.is_empty());
    assert_eq!(p.policy_start_date, Some(today));
    assert_eq!(p.policy_end_date, Some(date(2026, 5, 24)));
    assert_eq!(p.renewed_from_policy_id, Some(src.id));
    assert_eq!(p.previous_policy_number.as_deref(), Some("MOT-2024-001"));
    assert_eq!(p.user_id, src.user_id);
    assert_eq!(p.insurer, src.insurer);
    assert_eq!(p.premium_amount, src.premium_amount);
    assert_eq!(p.company_name, src.company_name);
    assert_eq!(p.details, src.details);
  }

  #[test]
  fn only_reusable_documents_carry_forward() {
    let today = date(2025, 7, 1);
    let cp = Classifier::default().classify_policy(source(date(2025, 5, 31)), today);
    assert_eq!(cp.status, PolicyStatus::Expired);
    let draft = RenewalDraft::initiate(&cp, today).unwrap();
    assert_eq!(draft.policy.documents.len(), 1);
    assert_eq!(draft.policy.documents[0].kind, DocumentKind::RegistrationCertificate);
  }

  #[test]
  fn reused_number_is_detected_loosely() {
    let today = date(2025, 7, 1);
    let cp = Classifier::default().classify_policy(source(date(2025, 5, 31)), today);
    let mut draft = RenewalDraft::initiate(&cp, today).unwrap();
    assert!(!draft.reuses_previous_number());
    draft.set_policy_number("  mot-2024-001 ");
    assert!(draft.reuses_previous_number());
    draft.set_policy_number("MOT-2025-001");
    assert!(!draft.reuses_previous_number());
  }
}
