//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use polis_core::{
  Error as CoreError,
  claim::{ClaimStatus, NewClaim, NewQuoteRequest, QuoteLine, QuoteStatus},
  duplicate::{DuplicateCheck, find_duplicate},
  notification::{NewNotification, NotificationKind, NotificationMetadata},
  policy::{
    CommercialDetails, HealthDetails, LobType, MotorDetails, NewPolicy, PolicyDetails,
    PolicyPatch, PolicyType, TravelDetails,
  },
  renewal::{RenewalDraft, RenewalState},
  service::create_policy,
  settings::{Grouping, SystemSettings},
  snapshot::load_snapshot,
  status::{Classifier, PolicyStatus},
  store::{PolicyInsert, PolicyStore},
  user::{CurrentUser, NewUser, Role, Scope},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

fn motor(user_id: Uuid, number: &str) -> NewPolicy {
  let mut p = NewPolicy::new(
    user_id,
    number,
    "ICICI Lombard",
    Decimal::from(12_000),
    PolicyDetails::Motor(MotorDetails {
      vehicle_number: "MH12AB1234".into(),
      vehicle_type: Some("Car".into()),
      ..Default::default()
    }),
  );
  p.policy_start_date = Some(date(2025, 1, 1));
  p.policy_end_date = Some(date(2025, 12, 31));
  p
}

fn health(user_id: Uuid, number: &str) -> NewPolicy {
  NewPolicy::new(
    user_id,
    number,
    "Star Health",
    Decimal::from(18_500),
    PolicyDetails::Health(HealthDetails {
      sum_insured: Some(Decimal::from(500_000)),
      lives_covered: Some(2),
      plan_name: None,
    }),
  )
}

fn commercial(user_id: Uuid, number: &str, company: &str) -> NewPolicy {
  let mut p = NewPolicy::new(
    user_id,
    number,
    "New India Assurance",
    Decimal::from(40_000),
    PolicyDetails::Commercial(CommercialDetails {
      lob_type:      LobType::Fire,
      business_name: Some(company.into()),
    }),
  );
  p.company_name = Some(company.into());
  p
}

async fn inserted(s: &SqliteStore, input: NewPolicy) -> polis_core::policy::Policy {
  match s.insert_policy(input).await.unwrap() {
    PolicyInsert::Inserted(p) => p,
    other => panic!("expected insert, got {other:?}"),
  }
}

async fn user(s: &SqliteStore, email: &str, role: Role, company: Option<&str>) -> CurrentUser {
  s.add_user(NewUser {
    email: email.into(),
    role,
    company_name: company.map(str::to_owned),
    password_hash: "$argon2id$placeholder".into(),
  })
  .await
  .unwrap()
  .user
}

// ─── Policies ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_policy() {
  let s = store().await;
  let owner = Uuid::new_v4();

  let p = inserted(&s, motor(owner, "  POL-001 ")).await;
  assert_eq!(p.policy_number, "POL-001");

  let fetched = s.get_policy(p.id).await.unwrap().unwrap();
  assert_eq!(fetched.policy_type(), PolicyType::Motor);
  assert_eq!(fetched.premium_amount, Decimal::from(12_000));
  assert_eq!(fetched.policy_end_date, Some(date(2025, 12, 31)));
  assert_eq!(fetched.details, p.details);
}

#[tokio::test]
async fn get_policy_missing_returns_none() {
  let s = store().await;
  assert!(s.get_policy(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn fractional_premium_survives_storage() {
  let s = store().await;
  let mut input = health(Uuid::new_v4(), "H-1");
  input.premium_amount = Decimal::new(1_234_550, 2);
  let p = inserted(&s, input).await;
  let fetched = s.get_policy(p.id).await.unwrap().unwrap();
  assert_eq!(fetched.premium_amount, Decimal::new(1_234_550, 2));
}

#[tokio::test]
async fn list_policies_newest_first_and_by_type() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let a = inserted(&s, motor(owner, "A")).await;
  let b = inserted(&s, health(owner, "B")).await;
  inserted(&s, motor(Uuid::new_v4(), "C")).await;

  let mine = s.list_policies(&Scope::Own(owner), None).await.unwrap();
  let ids: Vec<_> = mine.iter().map(|p| p.id).collect();
  assert_eq!(ids, vec![b.id, a.id]);

  let motors = s
    .list_policies(&Scope::Own(owner), Some(PolicyType::Motor))
    .await
    .unwrap();
  assert_eq!(motors.len(), 1);
  assert_eq!(motors[0].id, a.id);

  assert_eq!(s.list_policies(&Scope::All, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn company_scope_pools_members_and_tagged_policies() {
  let s = store().await;
  let alice = user(&s, "alice@acme.test", Role::CorporateEmployee, Some("Acme")).await;
  let bob = user(&s, "bob@example.test", Role::Individual, None).await;

  inserted(&s, health(alice.id, "ACME-H")).await;
  inserted(&s, commercial(bob.id, "ACME-C", "Acme")).await;
  inserted(&s, motor(bob.id, "BOB-M")).await;

  let pooled = s
    .list_policies(&Scope::Company("Acme".into()), None)
    .await
    .unwrap();
  let mut numbers: Vec<_> = pooled.iter().map(|p| p.policy_number.as_str()).collect();
  numbers.sort();
  assert_eq!(numbers, ["ACME-C", "ACME-H"]);
}

#[tokio::test]
async fn update_policy_applies_patch() {
  let s = store().await;
  let p = inserted(&s, motor(Uuid::new_v4(), "P-1")).await;

  let updated = s
    .update_policy(p.id, PolicyPatch {
      premium_amount: Some(Decimal::from(13_000)),
      policy_end_date: Some(date(2026, 1, 31)),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.premium_amount, Decimal::from(13_000));
  assert!(updated.updated_at >= p.updated_at);

  let fetched = s.get_policy(p.id).await.unwrap().unwrap();
  assert_eq!(fetched.policy_end_date, Some(date(2026, 1, 31)));
  assert_eq!(fetched.insurer, p.insurer);
}

#[tokio::test]
async fn update_policy_cannot_change_line() {
  let s = store().await;
  let p = inserted(&s, motor(Uuid::new_v4(), "P-1")).await;
  let err = s
    .update_policy(p.id, PolicyPatch {
      details: Some(PolicyDetails::Travel(TravelDetails::default())),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PolicyTypeChange(id) if id == p.id));
}

#[tokio::test]
async fn update_policy_cannot_take_existing_number() {
  let s = store().await;
  let owner = Uuid::new_v4();
  inserted(&s, motor(owner, "TAKEN")).await;
  let p = inserted(&s, health(owner, "FREE")).await;

  let err = s
    .update_policy(p.id, PolicyPatch {
      policy_number: Some("TAKEN".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PolicyNumberTaken(n) if n == "TAKEN"));
}

#[tokio::test]
async fn update_missing_policy_returns_none() {
  let s = store().await;
  let res = s
    .update_policy(Uuid::new_v4(), PolicyPatch::default())
    .await
    .unwrap();
  assert!(res.is_none());
}

#[tokio::test]
async fn delete_policy_cascades_claims() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let p = inserted(&s, motor(owner, "DEL")).await;
  let claim = s
    .insert_claim(NewClaim {
      user_id:       owner,
      policy_id:     p.id,
      incident_date: date(2025, 3, 1),
      description:   "rear bumper".into(),
      claim_amount:  None,
      documents:     vec![],
    })
    .await
    .unwrap();

  assert!(s.delete_policy(p.id).await.unwrap());
  assert!(!s.delete_policy(p.id).await.unwrap());
  assert!(s.get_claim(claim.id).await.unwrap().is_none());
}

// ─── Duplicate detection ─────────────────────────────────────────────────────

#[tokio::test]
async fn probe_finds_number_in_other_line() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let existing = inserted(&s, motor(owner, "ABC123")).await;

  let check = find_duplicate(&s, owner, "ABC123").await.unwrap();
  match check {
    DuplicateCheck::Exists { policy_type, policy_id, .. } => {
      assert_eq!(policy_type, PolicyType::Motor);
      assert_eq!(policy_id, existing.id);
    }
    DuplicateCheck::Unique => panic!("expected a duplicate"),
  }

  assert_eq!(
    find_duplicate(&s, owner, "XYZ999").await.unwrap(),
    DuplicateCheck::Unique
  );
}

#[tokio::test]
async fn probe_is_per_customer() {
  let s = store().await;
  inserted(&s, motor(Uuid::new_v4(), "SHARED-1")).await;
  let check = find_duplicate(&s, Uuid::new_v4(), "SHARED-1").await.unwrap();
  assert!(!check.exists());
}

#[tokio::test]
async fn probe_checks_every_line() {
  let s = store().await;
  let owner = Uuid::new_v4();
  inserted(&s, commercial(owner, "LATE-LINE", "Acme")).await;
  let check = find_duplicate(&s, owner, " LATE-LINE ").await.unwrap();
  assert!(matches!(
    check,
    DuplicateCheck::Exists { policy_type: PolicyType::Commercial, .. }
  ));
}

#[tokio::test]
async fn store_guard_rejects_cross_line_duplicate_without_probe() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let first = inserted(&s, motor(owner, "RACE-1")).await;

  let second = s.insert_policy(health(owner, "RACE-1")).await.unwrap();
  assert_eq!(second, PolicyInsert::Duplicate {
    policy_type: PolicyType::Motor,
    policy_id:   first.id,
  });
  assert_eq!(s.list_policies(&Scope::Own(owner), None).await.unwrap().len(), 1);
}

// ─── Create path and renewal ─────────────────────────────────────────────────

#[tokio::test]
async fn create_policy_defaults_term_and_rejects_duplicates() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let today = date(2024, 3, 1);

  let mut input = health(owner, "H-100");
  input.policy_start_date = None;
  let p = create_policy(&s, input, today).await.unwrap();
  assert_eq!(p.policy_start_date, Some(today));
  assert_eq!(p.policy_end_date, Some(date(2025, 2, 28)));

  let err = create_policy(&s, motor(owner, "H-100"), today)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    CoreError::DuplicatePolicy { policy_type: PolicyType::Health, policy_id } if policy_id == p.id
  ));
}

#[tokio::test]
async fn create_policy_validates_before_writing() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let mut input = motor(owner, "BAD");
  input.premium_amount = Decimal::ZERO;
  let err = create_policy(&s, input, date(2025, 1, 1)).await.unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));
  assert!(s.list_policies(&Scope::All, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn renewal_creates_linked_policy_and_keeps_source() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let source = inserted(&s, motor(owner, "MOT-2025")).await;
  let today = date(2025, 12, 20);

  let cp = Classifier::default().classify_policy(source.clone(), today);
  assert_eq!(cp.status, PolicyStatus::ExpiringSoon);

  let mut draft = RenewalDraft::initiate(&cp, today).unwrap();

  draft.set_policy_number("mot-2025");
  assert!(matches!(
    draft.submit(&s, today).await.unwrap_err(),
    CoreError::PolicyNumberReused
  ));
  assert_eq!(draft.state, RenewalState::DraftPrefilled);

  draft.set_policy_number("MOT-2026");
  let renewed = draft.submit(&s, today).await.unwrap();
  assert_eq!(draft.state, RenewalState::Submitted { policy_id: renewed.id });
  assert_eq!(renewed.renewed_from_policy_id, Some(source.id));
  assert_eq!(renewed.previous_policy_number.as_deref(), Some("MOT-2025"));
  assert_eq!(renewed.policy_end_date, Some(date(2026, 12, 19)));

  let untouched = s.get_policy(source.id).await.unwrap().unwrap();
  assert_eq!(untouched, source);

  assert!(matches!(
    draft.submit(&s, today).await.unwrap_err(),
    CoreError::RenewalAlreadySubmitted { .. }
  ));
}

#[tokio::test]
async fn source_renews_only_once_even_with_fresh_draft() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let source = inserted(&s, motor(owner, "MOT-2025")).await;
  let today = date(2025, 12, 20);
  let cp = Classifier::default().classify_policy(source.clone(), today);

  assert!(s.find_renewal_of(source.id).await.unwrap().is_none());

  let pristine = RenewalDraft::initiate(&cp, today).unwrap();
  let mut first = pristine.clone();
  first.set_policy_number("NEW-1");
  let renewed = first.submit(&s, today).await.unwrap();
  assert_eq!(s.find_renewal_of(source.id).await.unwrap().map(|p| p.id), Some(renewed.id));

  let mut replay = pristine;
  replay.set_policy_number("NEW-2");
  let err = replay.submit(&s, today).await.unwrap_err();
  assert!(
    matches!(err, CoreError::RenewalAlreadySubmitted { policy_id } if policy_id == renewed.id)
  );
  assert_eq!(replay.state, RenewalState::DraftPrefilled);
  assert_eq!(s.list_policies(&Scope::Own(owner), None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_renewal_submit_keeps_draft() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let source = inserted(&s, motor(owner, "OLD-1")).await;
  inserted(&s, health(owner, "TAKEN-1")).await;
  let today = date(2026, 1, 5);

  let cp = Classifier::default().classify_policy(source, today);
  let mut draft = RenewalDraft::initiate(&cp, today).unwrap();
  draft.set_policy_number("TAKEN-1");
  let before = draft.clone();

  assert!(matches!(
    draft.submit(&s, today).await.unwrap_err(),
    CoreError::DuplicatePolicy { .. }
  ));
  assert_eq!(draft, before);
}

// ─── Claims and quotes ───────────────────────────────────────────────────────

#[tokio::test]
async fn claims_lifecycle() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let p = inserted(&s, motor(owner, "CLM")).await;

  let claim = s
    .insert_claim(NewClaim {
      user_id:       owner,
      policy_id:     p.id,
      incident_date: date(2025, 4, 2),
      description:   "windscreen".into(),
      claim_amount:  Some(Decimal::from(8_000)),
      documents:     vec![],
    })
    .await
    .unwrap();
  assert_eq!(claim.status, ClaimStatus::New);

  let updated = s
    .set_claim_status(claim.id, ClaimStatus::Settled)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.status, ClaimStatus::Settled);
  assert_eq!(updated.incident_date, claim.incident_date);

  assert_eq!(s.list_claims(&Scope::Own(owner)).await.unwrap().len(), 1);
  assert!(s.list_claims(&Scope::Own(Uuid::new_v4())).await.unwrap().is_empty());
  assert!(
    s.set_claim_status(Uuid::new_v4(), ClaimStatus::Rejected)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn quotes_lifecycle() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let q = s
    .insert_quote(NewQuoteRequest {
      user_id:   owner,
      lob:       QuoteLine::Marine,
      details:   serde_json::json!({ "employees": 40 }),
      documents: vec![],
    })
    .await
    .unwrap();
  assert_eq!(q.status, QuoteStatus::New);

  let q2 = s
    .set_quote_status(q.id, QuoteStatus::Completed)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(q2.status, QuoteStatus::Completed);
  assert_eq!(q2.details["employees"], 40);

  let listed = s.list_quotes(&Scope::Own(owner)).await.unwrap();
  assert_eq!(listed, vec![q2]);
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn mark_read_is_scoped_and_idempotent() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let n = s
    .insert_notification(NewNotification {
      user_id:  owner,
      kind:     NotificationKind::PolicyExpiring7,
      title:    "Policy expiring soon".into(),
      message:  "POL-1 expires in 5 days".into(),
      metadata: Some(NotificationMetadata {
        policy_id: Some(Uuid::new_v4()),
        days_until_expiry: Some(5),
        ..Default::default()
      }),
    })
    .await
    .unwrap();
  assert!(!n.is_read);

  assert!(
    s.mark_notification_read(Uuid::new_v4(), n.id)
      .await
      .unwrap()
      .is_none()
  );

  let once = s.mark_notification_read(owner, n.id).await.unwrap().unwrap();
  let twice = s.mark_notification_read(owner, n.id).await.unwrap().unwrap();
  assert!(once.is_read);
  assert_eq!(once, twice);

  let listed = s.list_notifications(owner).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].metadata, n.metadata);
}

// ─── Users and settings ──────────────────────────────────────────────────────

#[tokio::test]
async fn users_unique_by_email() {
  let s = store().await;
  let u = user(&s, "Admin@Example.test", Role::Admin, None).await;

  let found = s.find_user_by_email("admin@example.test").await.unwrap().unwrap();
  assert_eq!(found.user, u);

  let err = s
    .add_user(NewUser {
      email:         "admin@example.test".into(),
      role:          Role::Individual,
      company_name:  None,
      password_hash: "x".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmailTaken(_)));
  assert!(s.find_user_by_email("nobody@example.test").await.unwrap().is_none());
}

#[tokio::test]
async fn settings_default_then_persist() {
  let s = store().await;
  assert!(!s.has_settings().await.unwrap());
  assert_eq!(s.get_settings().await.unwrap(), SystemSettings::default());

  let custom = SystemSettings {
    expiry_threshold_days: 30,
    currency_symbol:       "Rs.".into(),
    grouping:              Grouping::Western,
  };
  s.put_settings(custom.clone()).await.unwrap();
  s.put_settings(custom.clone()).await.unwrap();
  assert!(s.has_settings().await.unwrap());
  assert_eq!(s.get_settings().await.unwrap(), custom);
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_classifies_with_configured_threshold() {
  let s = store().await;
  let me = user(&s, "me@example.test", Role::Individual, None).await;
  let mut near = motor(me.id, "NEAR");
  near.policy_end_date = Some(date(2025, 6, 25));
  inserted(&s, near).await;

  let today = date(2025, 6, 1);
  let narrow = load_snapshot(&s, &me, &me.scope(), None, Classifier::new(15), today).await;
  assert_eq!(narrow.policies[0].status, PolicyStatus::Active);

  let wide = load_snapshot(&s, &me, &me.scope(), None, Classifier::new(30), today).await;
  assert_eq!(wide.policies[0].status, PolicyStatus::ExpiringSoon);
  assert_eq!(wide.summary().expiring_soon, 1);
  assert_eq!(wide.summary().threshold_days, 30);
}
