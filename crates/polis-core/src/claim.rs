//! Claims and quote requests.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uuid::Uuid;

use crate::policy::DocumentRef;

// ─── Claims ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
  New,
  #[strum(serialize = "In Progress")]
  InProgress,
  Settled,
  Rejected,
}

impl ClaimStatus {
  pub fn is_open(self) -> bool { matches!(self, Self::New | Self::InProgress) }
}

/// A claim against exactly one policy. The incident date never changes after
/// filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
  pub id:            Uuid,
  pub user_id:       Uuid,
  pub policy_id:     Uuid,
  pub status:        ClaimStatus,
  pub incident_date: NaiveDate,
  pub description:   String,
  pub claim_amount:  Option<Decimal>,
  #[serde(default)]
  pub documents:     Vec<DocumentRef>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewClaim {
  pub user_id:       Uuid,
  pub policy_id:     Uuid,
  pub incident_date: NaiveDate,
  pub description:   String,
  pub claim_amount:  Option<Decimal>,
  #[serde(default)]
  pub documents:     Vec<DocumentRef>,
}

// ─── Quotes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
  New,
  #[strum(serialize = "In Progress")]
  InProgress,
  Completed,
}

/// The line of business a quote is requested for.
///
/// Quotes are sold at a finer grain than stored policies: commercial cover is
/// quoted per line (group medical, group accident, fire, marine, liability)
/// rather than as one product.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuoteLine {
  Motor,
  Health,
  Life,
  Travel,
  Cyber,
  /// Group medical cover.
  Gmc,
  /// Group personal accident.
  Gpa,
  Fire,
  Marine,
  Liability,
  Other,
}

/// A customer's request for a quotation on a line of business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
  pub id:         Uuid,
  pub user_id:    Uuid,
  pub lob:        QuoteLine,
  pub status:     QuoteStatus,
  /// Free-form answers collected by the quote form.
  pub details:    serde_json::Value,
  #[serde(default)]
  pub documents:  Vec<DocumentRef>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuoteRequest {
  pub user_id:   Uuid,
  pub lob:       QuoteLine,
  #[serde(default)]
  pub details:   serde_json::Value,
  #[serde(default)]
  pub documents: Vec<DocumentRef>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quote_lines_are_their_own_vocabulary() {
    let line: QuoteLine = serde_json::from_str("\"gmc\"").unwrap();
    assert_eq!(line, QuoteLine::Gmc);
    assert_eq!(line.to_string(), "gmc");
    // "commercial" is a policy product, not something quoted as a whole.
    assert!(serde_json::from_str::<QuoteLine>("\"commercial\"").is_err());
  }

  #[test]
  fn open_claims() {
    assert!(ClaimStatus::New.is_open());
    assert!(ClaimStatus::InProgress.is_open());
    assert!(!ClaimStatus::Settled.is_open());
    assert!(!ClaimStatus::Rejected.is_open());
  }
}
