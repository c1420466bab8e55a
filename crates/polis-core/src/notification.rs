//! Notifications, the client-side feed merge, and expiry reminders.
//!
//! Pushed events may arrive more than once. [`NotificationFeed::apply`] is
//! idempotent: replaying an event leaves the feed unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};
use uuid::Uuid;

use crate::status::{ClassifiedPolicy, PolicyStatus};

/// How long after lapsing a policy still earns an "expired" reminder.
pub const EXPIRED_REMINDER_WINDOW_DAYS: i64 = 30;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
  #[serde(rename = "policy_expiring_30")]
  #[strum(serialize = "policy_expiring_30")]
  PolicyExpiring30,
  #[serde(rename = "policy_expiring_15")]
  #[strum(serialize = "policy_expiring_15")]
  PolicyExpiring15,
  #[serde(rename = "policy_expiring_7")]
  #[strum(serialize = "policy_expiring_7")]
  PolicyExpiring7,
  #[serde(rename = "policy_expiring_1")]
  #[strum(serialize = "policy_expiring_1")]
  PolicyExpiring1,
  PolicyExpired,
  ClaimStatusChanged,
  DocumentUploaded,
  Info,
  Warning,
  Success,
  Error,
}

impl NotificationKind {
  /// The reminder tier for a policy `days` away from its end date.
  pub fn expiry_tier(days: i64) -> Option<Self> {
    match days {
      d if d < -EXPIRED_REMINDER_WINDOW_DAYS => None,
      d if d < 0 => Some(Self::PolicyExpired),
      0..=1 => Some(Self::PolicyExpiring1),
      2..=7 => Some(Self::PolicyExpiring7),
      8..=15 => Some(Self::PolicyExpiring15),
      16..=30 => Some(Self::PolicyExpiring30),
      _ => None,
    }
  }
}

/// Structured context attached to a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMetadata {
  pub policy_id:         Option<Uuid>,
  pub policy_number:     Option<String>,
  pub insurer:           Option<String>,
  pub days_until_expiry: Option<i64>,
  pub claim_id:          Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub id:         Uuid,
  pub user_id:    Uuid,
  pub kind:       NotificationKind,
  pub title:      String,
  pub message:    String,
  /// Flips false → true exactly once.
  pub is_read:    bool,
  pub metadata:   Option<NotificationMetadata>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewNotification {
  pub user_id:  Uuid,
  pub kind:     NotificationKind,
  pub title:    String,
  pub message:  String,
  pub metadata: Option<NotificationMetadata>,
}

// ─── Push events and the local feed ──────────────────────────────────────────

/// An event delivered by the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "notification", rename_all = "snake_case")]
pub enum PushEvent {
  Inserted(Notification),
  Updated(Notification),
}

impl PushEvent {
  pub fn notification(&self) -> &Notification {
    match self {
      Self::Inserted(n) | Self::Updated(n) => n,
    }
  }
}

/// Locally held notifications, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFeed {
  items: Vec<Notification>,
}

impl NotificationFeed {
  /// Seed from a full fetch (expected newest first).
  pub fn from_fetched(items: Vec<Notification>) -> Self { Self { items } }

  pub fn items(&self) -> &[Notification] { &self.items }

  pub fn unread_count(&self) -> usize {
    self.items.iter().filter(|n| !n.is_read).count()
  }

  /// Merge one pushed event without refetching.
  ///
  /// An insert for an id already present is treated as an update. An update
  /// for an unknown id is dropped; the next full fetch will pick it up.
  pub fn apply(&mut self, event: PushEvent) {
    match event {
      PushEvent::Inserted(n) => {
        if !self.patch(n.clone()) {
          self.items.insert(0, n);
        }
      }
      PushEvent::Updated(n) => {
        self.patch(n);
      }
    }
  }

  /// Mark one notification read locally.
  pub fn mark_read(&mut self, id: Uuid) {
    if let Some(n) = self.items.iter_mut().find(|n| n.id == id) {
      n.is_read = true;
    }
  }

  fn patch(&mut self, incoming: Notification) -> bool {
    match self.items.iter_mut().find(|n| n.id == incoming.id) {
      Some(existing) => {
        let was_read = existing.is_read;
        *existing = incoming;
        existing.is_read |= was_read;
        true
      }
      None => false,
    }
  }
}

// ─── Expiry reminders ────────────────────────────────────────────────────────

/// Build the expiry reminders owed for `policies` as of `today`, skipping any
/// (kind, policy) pair already present in `existing`.
///
/// The tiers are fixed day counts. The title and message follow the policy's
/// classified status, so a reminder for a policy still outside the
/// configured window reads as advance notice rather than "expiring soon".
pub fn expiry_notifications(
  policies: &[ClassifiedPolicy],
  today: NaiveDate,
  existing: &[Notification],
) -> Vec<NewNotification> {
  let already_sent = |kind: NotificationKind, policy_id: Uuid| {
    existing.iter().any(|n| {
      n.kind == kind
        && n
          .metadata
          .as_ref()
          .and_then(|m| m.policy_id)
          .is_some_and(|id| id == policy_id)
    })
  };

  policies
    .iter()
    .filter_map(|cp| {
      let end = cp.policy.policy_end_date?;
      let days = (end - today).num_days();
      let kind = NotificationKind::expiry_tier(days)?;
      if already_sent(kind, cp.policy.id) {
        return None;
      }
      let number = &cp.policy.policy_number;
      let insurer = &cp.policy.insurer;
      let (title, message) = match cp.status {
        PolicyStatus::Expired => (
          "Policy expired",
          format!("Policy {number} with {insurer} expired on {end}."),
        ),
        PolicyStatus::ExpiringSoon => (
          "Policy expiring soon",
          format!("Policy {number} with {insurer} expires on {end} ({days} day(s) left)."),
        ),
        PolicyStatus::Active => (
          "Renewal coming up",
          format!("Policy {number} with {insurer} is due for renewal on {end}."),
        ),
      };
      Some(NewNotification {
        user_id: cp.policy.user_id,
        kind,
        title: title.to_owned(),
        message,
        metadata: Some(NotificationMetadata {
          policy_id:         Some(cp.policy.id),
          policy_number:     Some(number.clone()),
          insurer:           Some(cp.policy.insurer.clone()),
          days_until_expiry: Some(days),
          claim_id:          None,
        }),
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use rust_decimal::Decimal;
  use strum::IntoEnumIterator;

  use super::*;
  use crate::{
    policy::{CyberDetails, Policy, PolicyDetails},
    status::Classifier,
  };

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn note(id: Uuid, is_read: bool, title: &str) -> Notification {
    Notification {
      id,
      user_id: Uuid::nil(),
      kind: NotificationKind::Info,
      title: title.into(),
      message: String::new(),
      is_read,
      metadata: None,
      created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
    }
  }

  fn cyber(end: NaiveDate) -> Policy {
    let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    Policy {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      policy_number: "CY-1".into(),
      insurer: "HDFC Ergo".into(),
      premium_amount: Decimal::from(9_000),
      policy_start_date: Some(date(2025, 1, 1)),
      policy_end_date: Some(end),
      company_name: None,
      documents: vec![],
      renewed_from_policy_id: None,
      previous_policy_number: None,
      created_at: at,
      updated_at: at,
      details: PolicyDetails::Cyber(CyberDetails::default()),
    }
  }

  #[test]
  fn insert_prepends() {
    let mut feed = NotificationFeed::from_fetched(vec![note(Uuid::new_v4(), false, "old")]);
    let fresh = note(Uuid::new_v4(), false, "new");
    feed.apply(PushEvent::Inserted(fresh.clone()));
    assert_eq!(feed.items()[0], fresh);
    assert_eq!(feed.unread_count(), 2);
  }

  #[test]
  fn duplicate_insert_is_idempotent() {
    let mut feed = NotificationFeed::default();
    let n = note(Uuid::new_v4(), false, "hello");
    feed.apply(PushEvent::Inserted(n.clone()));
    feed.apply(PushEvent::Inserted(n));
    assert_eq!(feed.items().len(), 1);
    assert_eq!(feed.unread_count(), 1);
  }

  #[test]
  fn repeated_update_equals_single_update() {
    let id = Uuid::new_v4();
    let base = NotificationFeed::from_fetched(vec![note(id, false, "x")]);
    let event = PushEvent::Updated(note(id, true, "x"));

    let mut once = base.clone();
    once.apply(event.clone());

    let mut twice = base;
    twice.apply(event.clone());
    twice.apply(event);

    assert_eq!(once, twice);
    assert_eq!(twice.unread_count(), 0);
  }

  #[test]
  fn stale_update_cannot_unread() {
    let id = Uuid::new_v4();
    let mut feed = NotificationFeed::from_fetched(vec![note(id, true, "x")]);
    feed.apply(PushEvent::Updated(note(id, false, "x")));
    assert!(feed.items()[0].is_read);
  }

  #[test]
  fn update_for_unknown_id_is_dropped() {
    let mut feed = NotificationFeed::default();
    feed.apply(PushEvent::Updated(note(Uuid::new_v4(), false, "x")));
    assert!(feed.items().is_empty());
  }

  #[test]
  fn tiers() {
    assert_eq!(NotificationKind::expiry_tier(31), None);
    assert_eq!(NotificationKind::expiry_tier(30), Some(NotificationKind::PolicyExpiring30));
    assert_eq!(NotificationKind::expiry_tier(15), Some(NotificationKind::PolicyExpiring15));
    assert_eq!(NotificationKind::expiry_tier(7), Some(NotificationKind::PolicyExpiring7));
    assert_eq!(NotificationKind::expiry_tier(0), Some(NotificationKind::PolicyExpiring1));
    assert_eq!(NotificationKind::expiry_tier(-1), Some(NotificationKind::PolicyExpired));
    assert_eq!(NotificationKind::expiry_tier(-31), None);
  }

  #[test]
  fn kind_names_match_wire_names() {
    for kind in NotificationKind::iter() {
      let name: &'static str = kind.into();
      assert_eq!(serde_json::to_value(kind).unwrap(), name);
    }
  }

  #[test]
  fn reminder_wording_follows_configured_window() {
    let today = date(2025, 6, 1);
    let classifier = Classifier::new(5);
    let policies = classifier.classify_all(
      vec![cyber(date(2025, 6, 11)), cyber(date(2025, 6, 4)), cyber(date(2025, 5, 20))],
      today,
    );

    let notes = expiry_notifications(&policies, today, &[]);
    let titles: Vec<&str> = notes.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, ["Renewal coming up", "Policy expiring soon", "Policy expired"]);
    assert_eq!(notes[0].kind, NotificationKind::PolicyExpiring15);
    assert_eq!(notes[1].kind, NotificationKind::PolicyExpiring7);
  }

  #[test]
  fn reminders_are_sent_once_per_tier() {
    let today = date(2025, 6, 1);
    let policies = Classifier::default().classify_all(vec![cyber(date(2025, 6, 10))], today);

    let first = expiry_notifications(&policies, today, &[]);
    assert_eq!(first.len(), 1);
    let sent = Notification {
      id:         Uuid::new_v4(),
      user_id:    first[0].user_id,
      kind:       first[0].kind,
      title:      first[0].title.clone(),
      message:    first[0].message.clone(),
      is_read:    false,
      metadata:   first[0].metadata.clone(),
      created_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
    };
    assert!(expiry_notifications(&policies, today, &[sent]).is_empty());
  }
}
