//! Policy types — the records every portfolio computation starts from.
//!
//! A policy belongs to exactly one product line. The line is carried
//! explicitly as the [`PolicyDetails`] variant and is never inferred from which
//! fields happen to be populated.

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

// ─── Product lines ───────────────────────────────────────────────────────────

/// The six insurance product lines. Declaration order is the source-stable
/// order used for probing, grouping and report sections.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PolicyType {
  Motor,
  Health,
  Commercial,
  Travel,
  Life,
  Cyber,
}

impl PolicyType {
  /// Human-readable label used in report sections and sheet names.
  pub fn label(self) -> &'static str {
    match self {
      Self::Motor => "Motor",
      Self::Health => "Health",
      Self::Commercial => "Commercial",
      Self::Travel => "Travel",
      Self::Life => "Life",
      Self::Cyber => "Cyber",
    }
  }
}

/// Commercial line-of-business tag.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum LobType {
  #[strum(serialize = "GPA")]
  Gpa,
  Fire,
  #[default]
  Other,
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// File-storage buckets. Uploads outside this set are rejected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
  PolicyDocuments,
  ClaimDocuments,
  RcCopies,
  QuoteDocuments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
  PolicyCopy,
  RegistrationCertificate,
  IdentityProof,
  #[default]
  Other,
}

impl DocumentKind {
  /// Documents describing the insured object or person rather than a single
  /// policy term; these carry over into a renewal.
  pub fn is_reusable(self) -> bool {
    matches!(self, Self::RegistrationCertificate | Self::IdentityProof)
  }
}

/// A previously uploaded file, referenced by its public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
  pub bucket: Bucket,
  pub url:    String,
  #[serde(default)]
  pub kind:   DocumentKind,
}

// ─── Variant payloads ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorDetails {
  pub vehicle_number:     String,
  /// Free-text vehicle class, e.g. "Car", "Two Wheeler", "Commercial Vehicle".
  pub vehicle_type:       Option<String>,
  pub make:               Option<String>,
  pub model:              Option<String>,
  pub manufacturing_year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthDetails {
  pub sum_insured:   Option<Decimal>,
  pub lives_covered: Option<u32>,
  pub plan_name:     Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommercialDetails {
  #[serde(default)]
  pub lob_type:      LobType,
  pub business_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelDetails {
  pub destination: Option<String>,
  /// e.g. "Single Trip", "Multi Trip", "Student".
  pub trip_type:   Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifeDetails {
  pub nominee:     Option<String>,
  pub sum_assured: Option<Decimal>,
  pub plan_name:   Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CyberDetails {
  /// e.g. "Data Breach", "Ransomware".
  pub risk_type:       Option<String>,
  pub coverage_amount: Option<Decimal>,
}

/// The variant-specific payload of a policy. The variant is the policy's
/// [`PolicyType`] and is stored in the `policy_type` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PolicyDetails {
  Motor(MotorDetails),
  Health(HealthDetails),
  Commercial(CommercialDetails),
  Travel(TravelDetails),
  Life(LifeDetails),
  Cyber(CyberDetails),
}

impl PolicyDetails {
  pub fn policy_type(&self) -> PolicyType {
    match self {
      Self::Motor(_) => PolicyType::Motor,
      Self::Health(_) => PolicyType::Health,
      Self::Commercial(_) => PolicyType::Commercial,
      Self::Travel(_) => PolicyType::Travel,
      Self::Life(_) => PolicyType::Life,
      Self::Cyber(_) => PolicyType::Cyber,
    }
  }

  /// Serialise the inner payload (without the type tag) for storage.
  pub fn to_json(&self) -> crate::Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from the stored discriminant and JSON payload.
  pub fn from_parts(
    policy_type: PolicyType,
    data: serde_json::Value,
  ) -> crate::Result<Self> {
    let tag: &'static str = policy_type.into();
    let wrapped = serde_json::json!({ "type": tag, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// A persisted policy. Status is deliberately absent: it is a function of the
/// end date and the current day, see [`crate::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
  pub id:                     Uuid,
  pub user_id:                Uuid,
  pub policy_number:          String,
  pub insurer:                String,
  pub premium_amount:         Decimal,
  pub policy_start_date:      Option<NaiveDate>,
  /// The date coverage lapses. Health and commercial records historically call
  /// this `expiry_date`; both names are accepted on input.
  #[serde(alias = "expiry_date")]
  pub policy_end_date:        Option<NaiveDate>,
  /// Tenant field for corporate-pooled views.
  pub company_name:           Option<String>,
  #[serde(default)]
  pub documents:              Vec<DocumentRef>,
  pub renewed_from_policy_id: Option<Uuid>,
  pub previous_policy_number: Option<String>,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
  pub details:                PolicyDetails,
}

impl Policy {
  pub fn policy_type(&self) -> PolicyType { self.details.policy_type() }
}

// ─── NewPolicy ───────────────────────────────────────────────────────────────

/// Input to [`crate::service::create_policy`] and
/// [`crate::store::PolicyStore::insert_policy`]. Identity and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPolicy {
  pub user_id:                Uuid,
  pub policy_number:          String,
  pub insurer:                String,
  pub premium_amount:         Decimal,
  pub policy_start_date:      Option<NaiveDate>,
  #[serde(alias = "expiry_date")]
  pub policy_end_date:        Option<NaiveDate>,
  pub company_name:           Option<String>,
  #[serde(default)]
  pub documents:              Vec<DocumentRef>,
  pub renewed_from_policy_id: Option<Uuid>,
  pub previous_policy_number: Option<String>,
  pub details:                PolicyDetails,
}

impl NewPolicy {
  /// Convenience constructor with all optional fields unset.
  pub fn new(
    user_id: Uuid,
    policy_number: impl Into<String>,
    insurer: impl Into<String>,
    premium_amount: Decimal,
    details: PolicyDetails,
  ) -> Self {
    Self {
      user_id,
      policy_number: policy_number.into(),
      insurer: insurer.into(),
      premium_amount,
      policy_start_date: None,
      policy_end_date: None,
      company_name: None,
      documents: Vec::new(),
      renewed_from_policy_id: None,
      previous_policy_number: None,
      details,
    }
  }

  pub fn policy_type(&self) -> PolicyType { self.details.policy_type() }
}

// ─── PolicyPatch ─────────────────────────────────────────────────────────────

/// Partial update applied by the edit form or an administrator. `None` leaves
/// the field unchanged. The product line itself cannot change; a `details`
/// payload of a different type is rejected by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyPatch {
  pub policy_number:     Option<String>,
  pub insurer:           Option<String>,
  pub premium_amount:    Option<Decimal>,
  pub policy_start_date: Option<NaiveDate>,
  #[serde(alias = "expiry_date")]
  pub policy_end_date:   Option<NaiveDate>,
  pub company_name:      Option<String>,
  pub documents:         Option<Vec<DocumentRef>>,
  pub details:           Option<PolicyDetails>,
}

impl PolicyPatch {
  /// Apply the patch to `policy` in place. Does not touch `updated_at`.
  pub fn apply_to(self, policy: &mut Policy) {
    if let Some(v) = self.policy_number {
      policy.policy_number = v;
    }
    if let Some(v) = self.insurer {
      policy.insurer = v;
    }
    if let Some(v) = self.premium_amount {
      policy.premium_amount = v;
    }
    if let Some(v) = self.policy_start_date {
      policy.policy_start_date = Some(v);
    }
    if let Some(v) = self.policy_end_date {
      policy.policy_end_date = Some(v);
    }
    if let Some(v) = self.company_name {
      policy.company_name = Some(v);
    }
    if let Some(v) = self.documents {
      policy.documents = v;
    }
    if let Some(v) = self.details {
      policy.details = v;
    }
  }
}

// ─── Term arithmetic ─────────────────────────────────────────────────────────

/// The last covered day of a one-year term starting on `start`: one calendar
/// year later, minus one day.
///
/// The year is added with month arithmetic, which clamps Feb 29 to Feb 28 in a
/// non-leap year, so a term starting 2024-02-29 ends on 2025-02-27.
pub fn default_end_date(start: NaiveDate) -> NaiveDate {
  start
    .checked_add_months(Months::new(12))
    .and_then(|d| d.pred_opt())
    .unwrap_or(start)
}
