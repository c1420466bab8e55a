//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`. Money is stored as exact decimal text, never REAL. Closed
//! enums are stored as their serde names. UUIDs are stored as hyphenated
//! lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use polis_core::{
  claim::{Claim, QuoteRequest},
  notification::Notification,
  policy::{DocumentRef, Policy, PolicyDetails, PolicyType},
  user::{CurrentUser, UserAccount},
};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── Dates and times ─────────────────────────────────────────────────────────

/// Fixed-width so that text order matches time order in `ORDER BY`.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── Money ───────────────────────────────────────────────────────────────────

pub fn encode_decimal(d: Decimal) -> String { d.normalize().to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

// ─── Closed enums ────────────────────────────────────────────────────────────

/// Column text for a unit-variant enum: its serde name.
pub fn encode_tag<T: Serialize>(kind: &'static str, value: &T) -> Result<String> {
  match serde_json::to_value(value)? {
    serde_json::Value::String(s) => Ok(s),
    other => Err(Error::UnknownTag { kind, value: other.to_string() }),
  }
}

pub fn decode_tag<T: DeserializeOwned>(kind: &'static str, s: &str) -> Result<T> {
  serde_json::from_value(serde_json::Value::String(s.to_owned()))
    .map_err(|_| Error::UnknownTag { kind, value: s.to_owned() })
}

pub fn encode_policy_type(t: PolicyType) -> &'static str { t.into() }

pub fn decode_policy_type(s: &str) -> Result<PolicyType> {
  PolicyType::from_str(s).map_err(|_| Error::UnknownTag {
    kind:  "policy type",
    value: s.to_owned(),
  })
}

// ─── Documents ───────────────────────────────────────────────────────────────

pub fn encode_documents(docs: &[DocumentRef]) -> Result<String> {
  Ok(serde_json::to_string(docs)?)
}

pub fn decode_documents(s: &str) -> Result<Vec<DocumentRef>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawPolicy::from_row`].
pub const POLICY_COLUMNS: &str = "policy_id, user_id, policy_type, policy_number, insurer, \
   premium_amount, start_date, end_date, company_name, documents, renewed_from_policy_id, \
   previous_policy_number, details_json, created_at, updated_at";

/// Raw strings read directly from a `policies` row.
pub struct RawPolicy {
  pub policy_id:              String,
  pub user_id:                String,
  pub policy_type:            String,
  pub policy_number:          String,
  pub insurer:                String,
  pub premium_amount:         String,
  pub start_date:             Option<String>,
  pub end_date:               Option<String>,
  pub company_name:           Option<String>,
  pub documents:              String,
  pub renewed_from_policy_id: Option<String>,
  pub previous_policy_number: Option<String>,
  pub details_json:           String,
  pub created_at:             String,
  pub updated_at:             String,
}

impl RawPolicy {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      policy_id:              row.get(0)?,
      user_id:                row.get(1)?,
      policy_type:            row.get(2)?,
      policy_number:          row.get(3)?,
      insurer:                row.get(4)?,
      premium_amount:         row.get(5)?,
      start_date:             row.get(6)?,
      end_date:               row.get(7)?,
      company_name:           row.get(8)?,
      documents:              row.get(9)?,
      renewed_from_policy_id: row.get(10)?,
      previous_policy_number: row.get(11)?,
      details_json:           row.get(12)?,
      created_at:             row.get(13)?,
      updated_at:             row.get(14)?,
    })
  }

  pub fn into_policy(self) -> Result<Policy> {
    let policy_type = decode_policy_type(&self.policy_type)?;
    let details_json: serde_json::Value = serde_json::from_str(&self.details_json)?;

    Ok(Policy {
      id:                     decode_uuid(&self.policy_id)?,
      user_id:                decode_uuid(&self.user_id)?,
      policy_number:          self.policy_number,
      insurer:                self.insurer,
      premium_amount:         decode_decimal(&self.premium_amount)?,
      policy_start_date:      decode_opt_date(self.start_date)?,
      policy_end_date:        decode_opt_date(self.end_date)?,
      company_name:           self.company_name,
      documents:              decode_documents(&self.documents)?,
      renewed_from_policy_id: decode_opt_uuid(self.renewed_from_policy_id)?,
      previous_policy_number: self.previous_policy_number,
      created_at:             decode_dt(&self.created_at)?,
      updated_at:             decode_dt(&self.updated_at)?,
      details:                PolicyDetails::from_parts(policy_type, details_json)?,
    })
  }
}

pub const CLAIM_COLUMNS: &str = "claim_id, user_id, policy_id, status, incident_date, \
   description, claim_amount, documents, created_at, updated_at";

/// Raw strings read directly from a `claims` row.
pub struct RawClaim {
  pub claim_id:      String,
  pub user_id:       String,
  pub policy_id:     String,
  pub status:        String,
  pub incident_date: String,
  pub description:   String,
  pub claim_amount:  Option<String>,
  pub documents:     String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawClaim {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      claim_id:      row.get(0)?,
      user_id:       row.get(1)?,
      policy_id:     row.get(2)?,
      status:        row.get(3)?,
      incident_date: row.get(4)?,
      description:   row.get(5)?,
      claim_amount:  row.get(6)?,
      documents:     row.get(7)?,
      created_at:    row.get(8)?,
      updated_at:    row.get(9)?,
    })
  }

  pub fn into_claim(self) -> Result<Claim> {
    Ok(Claim {
      id:            decode_uuid(&self.claim_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      policy_id:     decode_uuid(&self.policy_id)?,
      status:        decode_tag("claim status", &self.status)?,
      incident_date: decode_date(&self.incident_date)?,
      description:   self.description,
      claim_amount:  self.claim_amount.as_deref().map(decode_decimal).transpose()?,
      documents:     decode_documents(&self.documents)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const QUOTE_COLUMNS: &str =
  "quote_id, user_id, lob, status, details_json, documents, created_at";

/// Raw strings read directly from a `quotes` row.
pub struct RawQuote {
  pub quote_id:     String,
  pub user_id:      String,
  pub lob:          String,
  pub status:       String,
  pub details_json: String,
  pub documents:    String,
  pub created_at:   String,
}

impl RawQuote {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      quote_id:     row.get(0)?,
      user_id:      row.get(1)?,
      lob:          row.get(2)?,
      status:       row.get(3)?,
      details_json: row.get(4)?,
      documents:    row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_quote(self) -> Result<QuoteRequest> {
    Ok(QuoteRequest {
      id:         decode_uuid(&self.quote_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      lob:        decode_tag("quote line", &self.lob)?,
      status:     decode_tag("quote status", &self.status)?,
      details:    serde_json::from_str(&self.details_json)?,
      documents:  decode_documents(&self.documents)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str =
  "notification_id, user_id, kind, title, message, is_read, metadata, created_at";

/// Raw strings read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub user_id:         String,
  pub kind:            String,
  pub title:           String,
  pub message:         String,
  pub is_read:         bool,
  pub metadata:        Option<String>,
  pub created_at:      String,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      user_id:         row.get(1)?,
      kind:            row.get(2)?,
      title:           row.get(3)?,
      message:         row.get(4)?,
      is_read:         row.get(5)?,
      metadata:        row.get(6)?,
      created_at:      row.get(7)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      id:         decode_uuid(&self.notification_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      kind:       decode_tag("notification kind", &self.kind)?,
      title:      self.title,
      message:    self.message,
      is_read:    self.is_read,
      metadata:   self
        .metadata
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const USER_COLUMNS: &str = "user_id, email, role, company_name, password_hash, created_at";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub role:          String,
  pub company_name:  Option<String>,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      email:         row.get(1)?,
      role:          row.get(2)?,
      company_name:  row.get(3)?,
      password_hash: row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_account(self) -> Result<UserAccount> {
    Ok(UserAccount {
      user:          CurrentUser {
        id:           decode_uuid(&self.user_id)?,
        email:        self.email,
        role:         decode_tag("role", &self.role)?,
        company_name: self.company_name,
      },
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use polis_core::{claim::ClaimStatus, notification::NotificationKind, user::Role};

  use super::*;

  #[test]
  fn tags_use_serde_names() {
    assert_eq!(encode_tag("role", &Role::CorporateAdmin).unwrap(), "corporate_admin");
    assert_eq!(
      encode_tag("kind", &NotificationKind::PolicyExpiring7).unwrap(),
      "policy_expiring_7"
    );
    let s: ClaimStatus = decode_tag("claim status", "in_progress").unwrap();
    assert_eq!(s, ClaimStatus::InProgress);
    assert!(decode_tag::<ClaimStatus>("claim status", "pending").is_err());
  }

  #[test]
  fn policy_type_column() {
    assert_eq!(encode_policy_type(PolicyType::Cyber), "cyber");
    assert_eq!(decode_policy_type("commercial").unwrap(), PolicyType::Commercial);
    assert!(decode_policy_type("marine").is_err());
  }

  #[test]
  fn decimals_keep_exact_value() {
    let d = decode_decimal("12345.50").unwrap();
    assert_eq!(encode_decimal(d), "12345.5");
    assert_eq!(decode_decimal(&encode_decimal(d)).unwrap(), d);
  }
}
