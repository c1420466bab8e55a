//! Handlers for `/dashboard` endpoints.
//!
//! Every figure is computed from one [`PortfolioSnapshot`] taken at request
//! time; nothing is cached.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/dashboard` | Optional `?as_of`, `?type`; [`DashboardSummary`] |
//! | `GET`  | `/dashboard/trends` | Optional `?year`; activity and renewals-due series |
//! | `GET`  | `/dashboard/breakdown` | `?type` required; optional `by_company`, `include_expired` |

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{Datelike, NaiveDate};
use polis_core::{
  aggregate::{
    self, BreakdownRow, ChartLegend, CompanyBreakdown, DashboardSummary, Dimension, MonthBucket,
  },
  policy::PolicyType,
  snapshot::{PortfolioSnapshot, load_snapshot},
  store::PolicyStore,
  user::{CurrentUser, Scope},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::Authenticated, error::ApiError};

async fn snapshot<S: PolicyStore>(
  state: &AppState<S>,
  user: &CurrentUser,
  policy_type: Option<PolicyType>,
  as_of: Option<NaiveDate>,
) -> Result<PortfolioSnapshot, ApiError> {
  let classifier = state.settings().await?.classifier();
  let as_of = as_of.unwrap_or_else(|| state.today());
  Ok(load_snapshot(state.store.as_ref(), user, &user.scope(), policy_type, classifier, as_of).await)
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub as_of:       Option<NaiveDate>,
  #[serde(rename = "type")]
  pub policy_type: Option<PolicyType>,
}

/// `GET /dashboard[?as_of=YYYY-MM-DD][&type=<type>]`
pub async fn summary<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Query(params): Query<SummaryParams>,
) -> Result<Json<DashboardSummary>, ApiError> {
  let snap = snapshot(&state, &user, params.policy_type, params.as_of).await?;
  Ok(Json(snap.summary()))
}

// ─── Trends ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TrendParams {
  pub year:        Option<i32>,
  #[serde(rename = "type")]
  pub policy_type: Option<PolicyType>,
}

#[derive(Debug, Serialize)]
pub struct Trends {
  pub year:         i32,
  /// Policies added per month, by creation date.
  pub activity:     [MonthBucket; 12],
  /// Policies whose cover ends in each month.
  pub renewals_due: [MonthBucket; 12],
}

/// `GET /dashboard/trends[?year=YYYY][&type=<type>]`
pub async fn trends<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Query(params): Query<TrendParams>,
) -> Result<Json<Trends>, ApiError> {
  let snap = snapshot(&state, &user, params.policy_type, None).await?;
  let year = params.year.unwrap_or_else(|| snap.as_of.year());
  Ok(Json(Trends {
    year,
    activity: aggregate::monthly_activity_trend(&snap.policies, year),
    renewals_due: aggregate::monthly_renewals_due(&snap.policies, year),
  }))
}

// ─── Breakdown ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BreakdownParams {
  #[serde(rename = "type")]
  pub policy_type:     PolicyType,
  /// Group by `company_name` first: the corporate-pooled view.
  #[serde(default)]
  pub by_company:      bool,
  /// Include lapsed policies. Defaults to the in-force set.
  #[serde(default)]
  pub include_expired: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Breakdown {
  Individual {
    dimension: Dimension,
    rows:      Vec<BreakdownRow>,
    legend:    ChartLegend,
  },
  Company {
    dimension: Dimension,
    companies: Vec<CompanyBreakdown>,
  },
}

/// `GET /dashboard/breakdown?type=<type>[&by_company=true][&include_expired=true]`
pub async fn breakdown<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Query(params): Query<BreakdownParams>,
) -> Result<Json<Breakdown>, ApiError> {
  if params.by_company && matches!(user.scope(), Scope::Own(_)) {
    return Err(ApiError::Forbidden(
      "the company view is limited to corporate administrators".into(),
    ));
  }

  let mut snap = snapshot(&state, &user, Some(params.policy_type), None).await?;
  if !params.include_expired {
    snap.policies.retain(|cp| cp.status.is_in_force());
  }
  let dimension = Dimension::for_type(params.policy_type);

  Ok(Json(if params.by_company {
    Breakdown::Company {
      dimension,
      companies: aggregate::premium_breakdown_by_company(&snap.policies, params.policy_type),
    }
  } else {
    let rows = aggregate::premium_breakdown(&snap.policies, params.policy_type);
    let legend = aggregate::chart_shares(rows.iter().map(|r| (r.category.clone(), r.total)));
    Breakdown::Individual { dimension, rows, legend }
  }))
}
