//! Handler for `GET /export`.
//!
//! CSV is returned as a file attachment. PDF and XLSX are returned as their
//! layout models in JSON, for a client-side renderer to turn into bytes.
//!
//! Query parameters:
//!
//! | Param | Notes |
//! |-------|-------|
//! | `format` | `csv`, `pdf` or `xlsx` (required) |
//! | `types` | Comma-separated product lines; omitted means all |
//! | `from`, `to` | Inclusive bounds on the policy start date |
//! | `status` | Restrict to one lifecycle status |
//! | `layout` | CSV only: `sectioned` (default) or `flat` |
//! | `include_company` | Append a Company column |

use std::str::FromStr;

use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use polis_core::{
  policy::PolicyType,
  status::{ClassifiedPolicy, PolicyStatus},
  store::PolicyStore,
  validate::validate_date_range,
};
use polis_export::{
  Artifact, CsvLayout, CurrencyFormat, ExportFormat, ReportOptions, export_filename,
  format::scope_token, serialize,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ExportParams {
  pub format:          ExportFormat,
  pub types:           Option<String>,
  pub from:            Option<NaiveDate>,
  pub to:              Option<NaiveDate>,
  pub status:          Option<PolicyStatus>,
  #[serde(default)]
  pub layout:          CsvLayout,
  #[serde(default)]
  pub include_company: bool,
}

fn parse_types(raw: Option<&str>) -> Result<Vec<PolicyType>, ApiError> {
  raw
    .into_iter()
    .flat_map(|s| s.split(','))
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      PolicyType::from_str(&s.to_ascii_lowercase())
        .map_err(|_| ApiError::BadRequest(format!("unknown policy type {s:?}")))
    })
    .collect()
}

fn in_range(cp: &ClassifiedPolicy, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
  if from.is_none() && to.is_none() {
    return true;
  }
  cp.policy
    .policy_start_date
    .is_some_and(|start| from.is_none_or(|f| start >= f) && to.is_none_or(|t| start <= t))
}

/// Strong ETag over the artifact bytes.
pub fn compute_etag(bytes: &[u8]) -> String {
  format!("\"{}\"", hex::encode(Sha256::digest(bytes)))
}

#[derive(Debug, Serialize)]
pub struct LayoutResponse<T> {
  pub filename: String,
  pub format:   ExportFormat,
  pub document: T,
}

/// `GET /export?format=<csv|pdf|xlsx>[&types=...][&from=...][&to=...]`
pub async fn handler<S: PolicyStore>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Query(params): Query<ExportParams>,
  headers: HeaderMap,
) -> Result<Response, ApiError> {
  validate_date_range(params.from, params.to)?;
  let selected = parse_types(params.types.as_deref())?;

  let settings = state.settings().await?;
  let today = state.today();
  let policies = state
    .store
    .list_policies(&user.scope(), None)
    .await
    .map_err(ApiError::store)?;

  let filtered: Vec<ClassifiedPolicy> = settings
    .classifier()
    .classify_all(policies, today)
    .into_iter()
    .filter(|cp| selected.is_empty() || selected.contains(&cp.policy.policy_type()))
    .filter(|cp| params.status.is_none_or(|s| cp.status == s))
    .filter(|cp| in_range(cp, params.from, params.to))
    .collect();

  let mut options = ReportOptions::new(format!("{} Policies", scope_token(&selected)), today);
  options.currency = CurrencyFormat {
    symbol:   settings.currency_symbol.clone(),
    grouping: settings.grouping,
  };
  options.include_company = params.include_company;
  options.csv_layout = params.layout;

  let filename = export_filename(&selected, params.from, params.to, params.format);
  let artifact = serialize(&filtered, params.format, options)?;
  info!(
    user_id = %user.id,
    format = params.format.extension(),
    policies = filtered.len(),
    %filename,
    "report exported"
  );

  Ok(match artifact {
    Artifact::Csv(bytes) => csv_response(bytes, &filename, &headers)?,
    Artifact::Workbook(document) => {
      Json(LayoutResponse { filename, format: params.format, document }).into_response()
    }
    Artifact::Pdf(document) => {
      Json(LayoutResponse { filename, format: params.format, document }).into_response()
    }
  })
}

fn csv_response(bytes: Vec<u8>, filename: &str, request: &HeaderMap) -> Result<Response, ApiError> {
  let etag = compute_etag(&bytes);

  let not_modified = request
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*"));

  let etag_value = HeaderValue::from_str(&etag)
    .map_err(|e| ApiError::BadRequest(format!("invalid etag: {e}")))?;
  if not_modified {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response());
  }

  let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
    .map_err(|_| ApiError::BadRequest("filename is not a valid header value".into()))?;

  Ok(
    (
      StatusCode::OK,
      [
        (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
        (header::CONTENT_DISPOSITION, disposition),
        (header::ETAG, etag_value),
      ],
      bytes,
    )
      .into_response(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn etag_is_stable_and_content_sensitive() {
    assert_eq!(compute_etag(b"a,b\n"), compute_etag(b"a,b\n"));
    assert_ne!(compute_etag(b"a,b\n"), compute_etag(b"a,c\n"));
    assert!(compute_etag(b"").starts_with('"'));
  }

  #[test]
  fn types_parse_case_insensitively() {
    assert_eq!(
      parse_types(Some("Motor, health")).unwrap(),
      [PolicyType::Motor, PolicyType::Health]
    );
    assert!(parse_types(None).unwrap().is_empty());
    assert!(matches!(parse_types(Some("boat")), Err(ApiError::BadRequest(_))));
  }
}
