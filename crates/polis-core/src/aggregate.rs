//! Portfolio aggregation — pure folds over a snapshot of classified policies.
//!
//! Sums are exact [`Decimal`] arithmetic. Functions that feed the "Total
//! Premium" and category cards restrict themselves to in-force policies
//! (Active + Expiring Soon); the listing count does not. The two policy counts
//! are separate functions and stay that way.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
  claim::{Claim, ClaimStatus},
  notification::Notification,
  policy::{LobType, PolicyDetails, PolicyType},
  status::{ClassifiedPolicy, PolicyStatus},
};

/// Label used when a grouping attribute is absent.
pub const UNSPECIFIED: &str = "Unspecified";

fn in_force(policies: &[ClassifiedPolicy]) -> impl Iterator<Item = &ClassifiedPolicy> {
  policies.iter().filter(|cp| cp.status.is_in_force())
}

// ─── Counts and totals ───────────────────────────────────────────────────────

/// Every fetched record, expired included — the "All Policies" table count.
pub fn total_policies_listed(policies: &[ClassifiedPolicy]) -> usize { policies.len() }

/// Active + Expiring Soon only — the dashboard summary card count.
pub fn total_policies_in_force(policies: &[ClassifiedPolicy]) -> usize {
  in_force(policies).count()
}

/// Premium over in-force policies. Adding an expired policy never changes it.
pub fn total_premium(policies: &[ClassifiedPolicy]) -> Decimal {
  in_force(policies).map(|cp| cp.policy.premium_amount).sum()
}

pub fn expiring_soon_count(policies: &[ClassifiedPolicy]) -> usize {
  policies
    .iter()
    .filter(|cp| cp.status == PolicyStatus::ExpiringSoon)
    .count()
}

pub fn expired_count(policies: &[ClassifiedPolicy]) -> usize {
  policies
    .iter()
    .filter(|cp| cp.status == PolicyStatus::Expired)
    .count()
}

// ─── Category breakdown ──────────────────────────────────────────────────────

/// In-force premium per product line, with Commercial further split by LOB.
///
/// `by_type` always holds all six lines (zero when empty). The LOB split sums
/// to the Commercial bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
  pub by_type:           BTreeMap<PolicyType, Decimal>,
  pub commercial_by_lob: BTreeMap<LobType, Decimal>,
}

impl CategoryBreakdown {
  pub fn total(&self) -> Decimal { self.by_type.values().copied().sum() }
}

pub fn portfolio_by_category(policies: &[ClassifiedPolicy]) -> CategoryBreakdown {
  let mut by_type: BTreeMap<PolicyType, Decimal> =
    PolicyType::iter().map(|t| (t, Decimal::ZERO)).collect();
  let mut commercial_by_lob: BTreeMap<LobType, Decimal> =
    LobType::iter().map(|l| (l, Decimal::ZERO)).collect();

  for cp in in_force(policies) {
    let premium = cp.policy.premium_amount;
    *by_type.entry(cp.policy.policy_type()).or_default() += premium;
    if let PolicyDetails::Commercial(c) = &cp.policy.details {
      *commercial_by_lob.entry(c.lob_type).or_default() += premium;
    }
  }

  CategoryBreakdown { by_type, commercial_by_lob }
}

// ─── Monthly trends ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
  /// 1 = January.
  pub month:   u32,
  pub count:   usize,
  pub premium: Decimal,
}

fn bucket_by_month(
  dates: impl Iterator<Item = (NaiveDate, Decimal)>,
  year: i32,
) -> [MonthBucket; 12] {
  let mut buckets: [MonthBucket; 12] = std::array::from_fn(|i| MonthBucket {
    month:   i as u32 + 1,
    count:   0,
    premium: Decimal::ZERO,
  });
  for (date, premium) in dates.filter(|(d, _)| d.year() == year) {
    let b = &mut buckets[date.month0() as usize];
    b.count += 1;
    b.premium += premium;
  }
  buckets
}

/// Activity trend: policies added per month of `year`, by `created_at`,
/// regardless of status.
pub fn monthly_activity_trend(policies: &[ClassifiedPolicy], year: i32) -> [MonthBucket; 12] {
  bucket_by_month(
    policies
      .iter()
      .map(|cp| (cp.policy.created_at.date_naive(), cp.policy.premium_amount)),
    year,
  )
}

/// Renewals-due trend: policies whose cover ends in each month of `year`.
/// Policies without an end date are skipped.
pub fn monthly_renewals_due(policies: &[ClassifiedPolicy], year: i32) -> [MonthBucket; 12] {
  bucket_by_month(
    policies.iter().filter_map(|cp| {
      cp.policy
        .policy_end_date
        .map(|end| (end, cp.policy.premium_amount))
    }),
    year,
  )
}

// ─── Per-dimension breakdowns ────────────────────────────────────────────────

/// The attribute a product line is broken down by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
  VehicleType,
  SumInsuredBand,
  LobType,
  TripType,
  RiskType,
}

impl Dimension {
  pub fn for_type(policy_type: PolicyType) -> Self {
    match policy_type {
      PolicyType::Motor => Self::VehicleType,
      PolicyType::Health | PolicyType::Life => Self::SumInsuredBand,
      PolicyType::Commercial => Self::LobType,
      PolicyType::Travel => Self::TripType,
      PolicyType::Cyber => Self::RiskType,
    }
  }
}

/// Band label for a Health sum insured or Life sum assured (1L = 100,000).
pub fn sum_insured_band(amount: Option<Decimal>) -> &'static str {
  const LAKH: i64 = 100_000;
  let Some(amount) = amount else {
    return UNSPECIFIED;
  };
  if amount < Decimal::from(5 * LAKH) {
    "Below 5L"
  } else if amount < Decimal::from(10 * LAKH) {
    "5L-10L"
  } else if amount < Decimal::from(25 * LAKH) {
    "10L-25L"
  } else if amount < Decimal::from(50 * LAKH) {
    "25L-50L"
  } else {
    "50L+"
  }
}

fn non_blank(s: &Option<String>) -> String {
  s.as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .unwrap_or(UNSPECIFIED)
    .to_owned()
}

/// The category of `details` under its line's [`Dimension`].
pub fn category_of(details: &PolicyDetails) -> String {
  match details {
    PolicyDetails::Motor(m) => non_blank(&m.vehicle_type),
    PolicyDetails::Health(h) => sum_insured_band(h.sum_insured).to_owned(),
    PolicyDetails::Life(l) => sum_insured_band(l.sum_assured).to_owned(),
    PolicyDetails::Commercial(c) => c.lob_type.to_string(),
    PolicyDetails::Travel(t) => non_blank(&t.trip_type),
    PolicyDetails::Cyber(c) => non_blank(&c.risk_type),
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownRow {
  pub category: String,
  pub count:    usize,
  pub total:    Decimal,
}

fn rows_from<'a>(policies: impl Iterator<Item = &'a ClassifiedPolicy>) -> Vec<BreakdownRow> {
  let mut acc: BTreeMap<String, (usize, Decimal)> = BTreeMap::new();
  for cp in policies {
    let entry = acc.entry(category_of(&cp.policy.details)).or_default();
    entry.0 += 1;
    entry.1 += cp.policy.premium_amount;
  }
  let mut rows: Vec<BreakdownRow> = acc
    .into_iter()
    .map(|(category, (count, total))| BreakdownRow { category, count, total })
    .collect();
  // Largest first; ties keep alphabetical order from the map.
  rows.sort_by(|a, b| b.total.cmp(&a.total));
  rows
}

/// Premium of `policy_type` policies grouped by that line's dimension. The
/// input set is used as given; callers choose the status filter.
pub fn premium_breakdown(
  policies: &[ClassifiedPolicy],
  policy_type: PolicyType,
) -> Vec<BreakdownRow> {
  rows_from(
    policies
      .iter()
      .filter(|cp| cp.policy.policy_type() == policy_type),
  )
}

/// One company's slice of a corporate-pooled breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyBreakdown {
  pub company_name: String,
  pub count:        usize,
  pub total:        Decimal,
  pub rows:         Vec<BreakdownRow>,
}

/// Like [`premium_breakdown`], but grouped by `company_name` first. Companies
/// are listed alphabetically.
pub fn premium_breakdown_by_company(
  policies: &[ClassifiedPolicy],
  policy_type: PolicyType,
) -> Vec<CompanyBreakdown> {
  let mut by_company: BTreeMap<String, Vec<&ClassifiedPolicy>> = BTreeMap::new();
  for cp in policies
    .iter()
    .filter(|cp| cp.policy.policy_type() == policy_type)
  {
    by_company
      .entry(non_blank(&cp.policy.company_name))
      .or_default()
      .push(cp);
  }

  by_company
    .into_iter()
    .map(|(company_name, group)| {
      let rows = rows_from(group.iter().copied());
      CompanyBreakdown {
        company_name,
        count: group.len(),
        total: group.iter().map(|cp| cp.policy.premium_amount).sum(),
        rows,
      }
    })
    .collect()
}

// ─── Chart legends ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Share {
  pub label:   String,
  pub value:   Decimal,
  /// `round(value / total * 100)`, halves rounded up.
  pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "shares", rename_all = "snake_case")]
pub enum ChartLegend {
  /// Nothing to chart.
  Empty,
  Shares(Vec<Share>),
}

/// Percent shares for a chart legend. Zero and negative buckets are dropped
/// before the total is taken; an all-zero input is [`ChartLegend::Empty`].
pub fn chart_shares<L: Into<String>>(
  buckets: impl IntoIterator<Item = (L, Decimal)>,
) -> ChartLegend {
  let kept: Vec<(String, Decimal)> = buckets
    .into_iter()
    .filter(|(_, v)| *v > Decimal::ZERO)
    .map(|(l, v)| (l.into(), v))
    .collect();
  let total: Decimal = kept.iter().map(|(_, v)| *v).sum();
  if total.is_zero() {
    return ChartLegend::Empty;
  }

  ChartLegend::Shares(
    kept
      .into_iter()
      .map(|(label, value)| {
        let percent = (value / total * Decimal::ONE_HUNDRED)
          .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
          .to_u32()
          .unwrap_or(0);
        Share { label, value, percent }
      })
      .collect(),
  )
}

/// Legend for the per-line premium chart.
pub fn category_legend(breakdown: &CategoryBreakdown) -> ChartLegend {
  chart_shares(
    breakdown
      .by_type
      .iter()
      .map(|(t, v)| (t.label(), *v)),
  )
}

// ─── Dashboard summary ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClaimTally {
  pub new:         usize,
  pub in_progress: usize,
  pub settled:     usize,
  pub rejected:    usize,
  pub open:        usize,
}

pub fn tally_claims(claims: &[Claim]) -> ClaimTally {
  let mut t = ClaimTally::default();
  for c in claims {
    match c.status {
      ClaimStatus::New => t.new += 1,
      ClaimStatus::InProgress => t.in_progress += 1,
      ClaimStatus::Settled => t.settled += 1,
      ClaimStatus::Rejected => t.rejected += 1,
    }
    if c.status.is_open() {
      t.open += 1;
    }
  }
  t
}

/// Everything the dashboard cards show, computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
  pub as_of:                NaiveDate,
  pub threshold_days:       u32,
  pub total_policies:       usize,
  pub listed_policies:      usize,
  pub total_premium:        Decimal,
  pub expiring_soon:        usize,
  pub expired:              usize,
  pub by_category:          CategoryBreakdown,
  pub category_legend:      ChartLegend,
  pub claims:               ClaimTally,
  pub unread_notifications: usize,
}

impl DashboardSummary {
  pub fn compute(
    as_of: NaiveDate,
    threshold_days: u32,
    policies: &[ClassifiedPolicy],
    claims: &[Claim],
    notifications: &[Notification],
  ) -> Self {
    let by_category = portfolio_by_category(policies);
    Self {
      as_of,
      threshold_days,
      total_policies: total_policies_in_force(policies),
      listed_policies: total_policies_listed(policies),
      total_premium: total_premium(policies),
      expiring_soon: expiring_soon_count(policies),
      expired: expired_count(policies),
      category_legend: category_legend(&by_category),
      by_category,
      claims: tally_claims(claims),
      unread_notifications: notifications.iter().filter(|n| !n.is_read).count(),
    }
  }
}
