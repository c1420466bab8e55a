//! Currency rendering and deterministic export filenames.

use chrono::NaiveDate;
use polis_core::{policy::PolicyType, settings::Grouping};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

// ─── Currency ────────────────────────────────────────────────────────────────

/// Insert separators into a run of ASCII digits.
fn group_digits(digits: &str, grouping: Grouping) -> String {
  let len = digits.len();
  if len <= 3 {
    return digits.to_owned();
  }

  let (head, tail) = digits.split_at(len - 3);
  let step = match grouping {
    Grouping::Indian => 2,
    Grouping::Western => 3,
  };

  // Walk the head from the right in `step`-sized chunks.
  let mut chunks = Vec::new();
  let mut end = head.len();
  while end > 0 {
    let start = end.saturating_sub(step);
    chunks.push(&head[start..end]);
    end = start;
  }
  chunks.reverse();
  chunks.push(tail);
  chunks.join(",")
}

/// Split `amount` into grouped whole units and an optional two-digit
/// fraction. The fraction is present only when the amount, rounded to paise,
/// is not whole.
fn split_amount(amount: Decimal, grouping: Grouping) -> (String, Option<String>) {
  let rounded = amount.abs().round_dp(2);
  let whole = rounded.trunc().normalize();
  let cents = ((rounded - whole) * Decimal::ONE_HUNDRED)
    .to_u32()
    .unwrap_or(0);
  let grouped = group_digits(&whole.to_string(), grouping);
  (grouped, (cents != 0).then(|| format!("{cents:02}")))
}

/// Render `amount` for display, e.g. `₹1,23,45,678` or `₹1,234.50`.
pub fn format_currency(amount: Decimal, symbol: &str, grouping: Grouping) -> String {
  let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
  match split_amount(amount, grouping) {
    (whole, Some(frac)) => format!("{sign}{symbol}{whole}.{frac}"),
    (whole, None) => format!("{sign}{symbol}{whole}"),
  }
}

/// The bare magnitude written to CSV cells: no symbol, no separators.
pub fn plain_amount(amount: Decimal) -> String {
  let rounded = amount.round_dp(2);
  if rounded.fract().is_zero() {
    rounded.trunc().normalize().to_string()
  } else {
    format!("{rounded:.2}")
  }
}

/// The symbol and grouping used by every rendered amount in one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyFormat {
  pub symbol:   String,
  pub grouping: Grouping,
}

impl Default for CurrencyFormat {
  fn default() -> Self {
    Self { symbol: "₹".to_owned(), grouping: Grouping::Indian }
  }
}

impl CurrencyFormat {
  pub fn format(&self, amount: Decimal) -> String {
    format_currency(amount, &self.symbol, self.grouping)
  }

  /// A spreadsheet number format matching [`Self::format`] for whole amounts.
  pub fn number_format(&self) -> String {
    let body = match self.grouping {
      Grouping::Indian => "#,##,##0",
      Grouping::Western => "#,##0",
    };
    format!("\"{}\"{body}", self.symbol)
  }
}

pub fn format_date(date: NaiveDate) -> String { date.format("%Y-%m-%d").to_string() }

// ─── Filenames ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
  Pdf,
  Xlsx,
  Csv,
}

impl ExportFormat {
  pub fn extension(self) -> &'static str {
    match self {
      Self::Pdf => "pdf",
      Self::Xlsx => "xlsx",
      Self::Csv => "csv",
    }
  }
}

/// The scope token for a filename: `All` when no line (or every line) was
/// selected, the line's label for exactly one, otherwise `Mixed`.
pub fn scope_token(selected: &[PolicyType]) -> &'static str {
  let mut distinct: Vec<PolicyType> = selected.to_vec();
  distinct.sort();
  distinct.dedup();
  match distinct.as_slice() {
    [] => "All",
    [only] => only.label(),
    many if many.len() == 6 => "All",
    _ => "Mixed",
  }
}

/// `{All|<Type>|Mixed}_Policies_<from>_to_<to>.<ext>`. An open end of the
/// range is written as `start` or `end`.
pub fn export_filename(
  selected: &[PolicyType],
  from: Option<NaiveDate>,
  to: Option<NaiveDate>,
  format: ExportFormat,
) -> String {
  let from = from.map_or_else(|| "start".to_owned(), format_date);
  let to = to.map_or_else(|| "end".to_owned(), format_date);
  format!(
    "{}_Policies_{from}_to_{to}.{}",
    scope_token(selected),
    format.extension()
  )
}
