//! Spreadsheet model: one sheet per populated section.
//!
//! The model is handed to a renderer that writes the actual `.xlsx` bytes.
//! Amounts stay numeric, tagged with the report's currency number format, so
//! sums still work in the spreadsheet.

use serde::{Deserialize, Serialize};

use crate::report::{Cell, Report};

/// Spreadsheet applications reject longer sheet names.
pub const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
  pub name:            String,
  pub header:          Vec<String>,
  pub rows:            Vec<Vec<Cell>>,
  /// Number format for [`Cell::Currency`] cells, e.g. `"₹"#,##,##0`.
  pub currency_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
  pub title:  String,
  pub sheets: Vec<Sheet>,
}

fn sheet_name(title: &str) -> String { title.chars().take(MAX_SHEET_NAME).collect() }

impl Workbook {
  pub fn from_report(report: &Report) -> Self {
    let currency_format = report.options.currency.number_format();
    Self {
      title:  report.options.title.clone(),
      sheets: report
        .sections
        .iter()
        .map(|s| Sheet {
          name:            sheet_name(&s.title),
          header:          s.columns.clone(),
          rows:            s.rows.clone(),
          currency_format: currency_format.clone(),
        })
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use rust_decimal::Decimal;

  use super::*;
  use crate::report::test_helpers::*;

  #[test]
  fn one_sheet_per_section_with_numeric_premiums() {
    let report = Report::build(&[motor("M-1", 12_000), health("H-1", 18_500)], options()).unwrap();
    let wb = Workbook::from_report(&report);

    let names: Vec<_> = wb.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Motor Policies", "Health Policies"]);
    assert_eq!(wb.sheets[0].rows[0][2], Cell::Currency(Decimal::from(12_000)));
    assert_eq!(wb.sheets[0].currency_format, "\"₹\"#,##,##0");
  }

  #[test]
  fn long_titles_are_truncated() {
    assert_eq!(sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME);
  }
}
