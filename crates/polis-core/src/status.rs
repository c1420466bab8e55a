//! Lifecycle status — derived from the end date at read time, never stored.
//!
//! Classification works on calendar days: both the end date and "today" are
//! [`NaiveDate`]s, so the time of day at which a request runs cannot move a
//! policy across a boundary.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::policy::Policy;

/// Default width, in days, of the "Expiring Soon" window.
pub const DEFAULT_THRESHOLD_DAYS: u32 = 15;

/// The computed lifecycle state of a policy.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
  Active,
  #[strum(serialize = "Expiring Soon")]
  ExpiringSoon,
  Expired,
}

impl PolicyStatus {
  /// Active and Expiring Soon policies still provide cover.
  pub fn is_in_force(self) -> bool { !matches!(self, Self::Expired) }

  /// Only lapsing or lapsed policies expose a renewal action.
  pub fn is_renewable(self) -> bool { !matches!(self, Self::Active) }
}

/// Maps end dates to [`PolicyStatus`] for a configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
  threshold_days: u32,
}

impl Default for Classifier {
  fn default() -> Self { Self::new(DEFAULT_THRESHOLD_DAYS) }
}

impl Classifier {
  pub fn new(threshold_days: u32) -> Self { Self { threshold_days } }

  pub fn threshold_days(&self) -> u32 { self.threshold_days }

  /// Whole days from `today` until `end`; negative once lapsed.
  pub fn days_until(end: NaiveDate, today: NaiveDate) -> i64 {
    (end - today).num_days()
  }

  /// Classify an end date relative to `today`.
  ///
  /// A missing end date is treated as already lapsed. The threshold day itself
  /// belongs to the Expiring Soon window.
  pub fn classify(&self, end: Option<NaiveDate>, today: NaiveDate) -> PolicyStatus {
    let Some(end) = end else {
      return PolicyStatus::Expired;
    };
    let diff = Self::days_until(end, today);
    if diff < 0 {
      PolicyStatus::Expired
    } else if diff <= i64::from(self.threshold_days) {
      PolicyStatus::ExpiringSoon
    } else {
      PolicyStatus::Active
    }
  }

  /// Classify an untrusted textual end date. Accepts `YYYY-MM-DD` or an RFC
  /// 3339 timestamp (its calendar date is used); anything else is `Expired`.
  pub fn classify_str(&self, raw: Option<&str>, today: NaiveDate) -> PolicyStatus {
    self.classify(raw.and_then(parse_end_date), today)
  }

  /// Label a single policy.
  pub fn classify_policy(&self, policy: Policy, today: NaiveDate) -> ClassifiedPolicy {
    let status = self.classify(policy.policy_end_date, today);
    let days_until_expiry = policy
      .policy_end_date
      .map(|end| Self::days_until(end, today));
    ClassifiedPolicy { policy, status, days_until_expiry }
  }

  /// Label every policy in `policies`, preserving order.
  pub fn classify_all(
    &self,
    policies: impl IntoIterator<Item = Policy>,
    today: NaiveDate,
  ) -> Vec<ClassifiedPolicy> {
    policies
      .into_iter()
      .map(|p| self.classify_policy(p, today))
      .collect()
  }
}

fn parse_end_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
    DateTime::parse_from_rfc3339(raw)
      .ok()
      .map(|dt| dt.date_naive())
  })
}

/// A policy bundled with its status as of a particular day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPolicy {
  #[serde(flatten)]
  pub policy:            Policy,
  pub status:            PolicyStatus,
  pub days_until_expiry: Option<i64>,
}

#[cfg(test)]
mod tests {
  use chrono::Days;

  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 6, 10).unwrap() }

  #[test]
  fn threshold_day_is_expiring_soon() {
    let c = Classifier::default();
    let end = today().checked_add_days(Days::new(15)).unwrap();
    assert_eq!(c.classify(Some(end), today()), PolicyStatus::ExpiringSoon);
  }

  #[test]
  fn day_after_threshold_is_active() {
    let c = Classifier::default();
    let end = today().checked_add_days(Days::new(16)).unwrap();
    assert_eq!(c.classify(Some(end), today()), PolicyStatus::Active);
  }

  #[test]
  fn yesterday_is_expired() {
    let c = Classifier::default();
    let end = today().pred_opt().unwrap();
    assert_eq!(c.classify(Some(end), today()), PolicyStatus::Expired);
  }

  #[test]
  fn ending_today_is_still_in_force() {
    let c = Classifier::default();
    assert_eq!(c.classify(Some(today()), today()), PolicyStatus::ExpiringSoon);
  }

  #[test]
  fn missing_end_date_is_expired() {
    assert_eq!(Classifier::default().classify(None, today()), PolicyStatus::Expired);
  }

  #[test]
  fn unparseable_text_is_expired() {
    let c = Classifier::default();
    assert_eq!(c.classify_str(Some("31/12/2099"), today()), PolicyStatus::Expired);
    assert_eq!(c.classify_str(Some(""), today()), PolicyStatus::Expired);
    assert_eq!(c.classify_str(None, today()), PolicyStatus::Expired);
  }

  #[test]
  fn rfc3339_uses_calendar_date_only() {
    let c = Classifier::default();
    assert_eq!(
      c.classify_str(Some("2025-06-25T23:59:59+00:00"), today()),
      PolicyStatus::ExpiringSoon
    );
    assert_eq!(
      c.classify_str(Some("2025-06-26T00:00:01+00:00"), today()),
      PolicyStatus::Active
    );
  }

  #[test]
  fn custom_threshold_moves_the_boundary() {
    let c = Classifier::new(30);
    let end = today().checked_add_days(Days::new(30)).unwrap();
    assert_eq!(c.classify(Some(end), today()), PolicyStatus::ExpiringSoon);
    assert_eq!(Classifier::default().classify(Some(end), today()), PolicyStatus::Active);
  }
}
