//! The format-independent report model.
//!
//! Policies are partitioned by product line into sections, in [`PolicyType`]
//! order. A line with no records produces no section at all. Every section
//! starts with the same common columns and then appends its line's own.

use chrono::NaiveDate;
use polis_core::{
  policy::{Policy, PolicyDetails, PolicyType},
  status::{ClassifiedPolicy, PolicyStatus},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{
  Error, Result,
  format::{CurrencyFormat, format_date, plain_amount},
};

/// Columns every section carries, in order.
pub const COMMON_COLUMNS: [&str; 6] =
  ["Policy Number", "Insurer", "Premium", "Status", "Start Date", "End Date"];

/// Extra columns for one product line.
pub fn variant_columns(policy_type: PolicyType) -> &'static [&'static str] {
  match policy_type {
    PolicyType::Motor => &["Vehicle Number", "Vehicle Type", "Make", "Model", "Year"],
    PolicyType::Health => &["Sum Insured", "Lives Covered", "Plan"],
    PolicyType::Commercial => &["LOB", "Business Name"],
    PolicyType::Travel => &["Destination", "Trip Type"],
    PolicyType::Life => &["Nominee", "Sum Assured", "Plan"],
    PolicyType::Cyber => &["Risk Type", "Coverage Amount"],
  }
}

// ─── Cells ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
  Blank,
  Text(String),
  Integer(i64),
  Currency(Decimal),
  Date(NaiveDate),
  Status(PolicyStatus),
}

impl Cell {
  fn text(s: &Option<String>) -> Self {
    match s.as_deref().map(str::trim) {
      Some(s) if !s.is_empty() => Self::Text(s.to_owned()),
      _ => Self::Blank,
    }
  }

  fn money(d: Option<Decimal>) -> Self { d.map_or(Self::Blank, Self::Currency) }

  fn date(d: Option<NaiveDate>) -> Self { d.map_or(Self::Blank, Self::Date) }

  /// Unformatted text: bare numbers, ISO dates.
  pub fn plain(&self) -> String {
    match self {
      Self::Blank => String::new(),
      Self::Text(s) => s.clone(),
      Self::Integer(n) => n.to_string(),
      Self::Currency(d) => plain_amount(*d),
      Self::Date(d) => format_date(*d),
      Self::Status(s) => s.to_string(),
    }
  }

  /// Display text: currency carries its symbol and grouping.
  pub fn display(&self, currency: &CurrencyFormat) -> String {
    match self {
      Self::Currency(d) => currency.format(*d),
      other => other.plain(),
    }
  }
}

fn variant_cells(details: &PolicyDetails) -> Vec<Cell> {
  match details {
    PolicyDetails::Motor(m) => vec![
      Cell::Text(m.vehicle_number.clone()),
      Cell::text(&m.vehicle_type),
      Cell::text(&m.make),
      Cell::text(&m.model),
      m.manufacturing_year
        .map_or(Cell::Blank, |y| Cell::Integer(i64::from(y))),
    ],
    PolicyDetails::Health(h) => vec![
      Cell::money(h.sum_insured),
      h.lives_covered
        .map_or(Cell::Blank, |n| Cell::Integer(i64::from(n))),
      Cell::text(&h.plan_name),
    ],
    PolicyDetails::Commercial(c) => vec![
      Cell::Text(c.lob_type.to_string()),
      Cell::text(&c.business_name),
    ],
    PolicyDetails::Travel(t) => vec![Cell::text(&t.destination), Cell::text(&t.trip_type)],
    PolicyDetails::Life(l) => vec![
      Cell::text(&l.nominee),
      Cell::money(l.sum_assured),
      Cell::text(&l.plan_name),
    ],
    PolicyDetails::Cyber(c) => vec![Cell::text(&c.risk_type), Cell::money(c.coverage_amount)],
  }
}

fn common_cells(p: &Policy, status: PolicyStatus) -> Vec<Cell> {
  vec![
    Cell::Text(p.policy_number.clone()),
    Cell::Text(p.insurer.clone()),
    Cell::Currency(p.premium_amount),
    Cell::Status(status),
    Cell::date(p.policy_start_date),
    Cell::date(p.policy_end_date),
  ]
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// How the CSV artifact is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvLayout {
  /// A titled block per product line.
  #[default]
  Sectioned,
  /// One table with a leading Type column and only the common columns.
  Flat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
  pub title:           String,
  pub generated_on:    NaiveDate,
  pub currency:        CurrencyFormat,
  /// Append a Company column; used for corporate-pooled exports.
  pub include_company: bool,
  pub csv_layout:      CsvLayout,
}

impl ReportOptions {
  pub fn new(title: impl Into<String>, generated_on: NaiveDate) -> Self {
    Self {
      title: title.into(),
      generated_on,
      currency: CurrencyFormat::default(),
      include_company: false,
      csv_layout: CsvLayout::default(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
  pub policy_type:   PolicyType,
  pub title:         String,
  pub columns:       Vec<String>,
  pub rows:          Vec<Vec<Cell>>,
  pub total_premium: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
  pub options:       ReportOptions,
  pub sections:      Vec<Section>,
  pub policy_count:  usize,
  pub total_premium: Decimal,
}

impl Report {
  /// Group `policies` into sections. Input order is kept within a section.
  pub fn build(policies: &[ClassifiedPolicy], options: ReportOptions) -> Result<Self> {
    if policies.is_empty() {
      return Err(Error::EmptyReport);
    }

    let sections: Vec<Section> = PolicyType::iter()
      .filter_map(|policy_type| {
        let members: Vec<&ClassifiedPolicy> = policies
          .iter()
          .filter(|cp| cp.policy.policy_type() == policy_type)
          .collect();
        if members.is_empty() {
          return None;
        }

        let mut columns: Vec<String> = COMMON_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(variant_columns(policy_type).iter().map(|c| c.to_string()));
        if options.include_company {
          columns.push("Company".to_owned());
        }

        let rows = members
          .iter()
          .map(|cp| {
            let mut row = common_cells(&cp.policy, cp.status);
            row.extend(variant_cells(&cp.policy.details));
            if options.include_company {
              row.push(Cell::text(&cp.policy.company_name));
            }
            row
          })
          .collect();

        Some(Section {
          policy_type,
          title: format!("{} Policies", policy_type.label()),
          columns,
          rows,
          total_premium: members.iter().map(|cp| cp.policy.premium_amount).sum(),
        })
      })
      .collect();

    Ok(Self {
      policy_count: policies.len(),
      total_premium: sections.iter().map(|s| s.total_premium).sum(),
      options,
      sections,
    })
  }
}


#[cfg(test)]
mod tests {
  use super::{test_helpers::*, *};

  #[test]
  fn empty_input_is_an_error() {
    assert!(matches!(Report::build(&[], options()), Err(Error::EmptyReport)));
  }

  #[test]
  fn only_populated_lines_get_sections() {
    let input = [commercial("C-1", 40_000), health("H-1", 18_500), health("H-2", 9_000)];
    let report = Report::build(&input, options()).unwrap();

    assert_eq!(report.sections.len(), 2);
    assert_eq!(report.sections[0].policy_type, PolicyType::Health);
    assert_eq!(report.sections[1].policy_type, PolicyType::Commercial);
    assert_eq!(report.sections[0].rows.len(), 2);
    assert_eq!(report.sections[0].title, "Health Policies");
    assert_eq!(report.policy_count, 3);
    assert_eq!(report.total_premium, Decimal::from(67_500));
  }

  #[test]
  fn every_section_starts_with_common_columns() {
    let input = [motor("M-1", 1), health("H-1", 1), commercial("C-1", 1)];
    let report = Report::build(&input, options()).unwrap();
    for section in &report.sections {
      assert_eq!(section.columns[..6], COMMON_COLUMNS);
      assert_eq!(
        section.columns.len(),
        6 + variant_columns(section.policy_type).len()
      );
      assert!(section.rows.iter().all(|r| r.len() == section.columns.len()));
    }
  }

  #[test]
  fn company_column_is_opt_in() {
    let mut opts = options();
    opts.include_company = true;
    let report = Report::build(&[health("H-1", 1)], opts).unwrap();
    let s = &report.sections[0];
    assert_eq!(s.columns.last().map(String::as_str), Some("Company"));
    assert_eq!(s.rows[0].last(), Some(&Cell::Text("Acme".into())));
  }

  #[test]
  fn cells_render_plain_and_display() {
    let c = Cell::Currency(Decimal::from(150_000));
    assert_eq!(c.plain(), "150000");
    assert_eq!(c.display(&CurrencyFormat::default()), "₹1,50,000");
    assert_eq!(Cell::Status(PolicyStatus::ExpiringSoon).plain(), "Expiring Soon");
    assert_eq!(Cell::Date(date(2025, 2, 3)).plain(), "2025-02-03");
    assert_eq!(Cell::Blank.plain(), "");
  }
}
