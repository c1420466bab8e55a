//! CSV rendering.
//!
//! Amounts are written as bare numbers so spreadsheet formulas work on them.
//! Quoting and escaping are left to the `csv` writer.

use polis_core::policy::PolicyType;

use crate::{
  Result,
  report::{COMMON_COLUMNS, CsvLayout, Report},
};

/// Render `report` using its configured [`CsvLayout`].
pub fn write_csv(report: &Report) -> Result<Vec<u8>> {
  match report.options.csv_layout {
    CsvLayout::Sectioned => write_sectioned(report),
    CsvLayout::Flat => write_flat(report),
  }
}

fn writer() -> csv::Writer<Vec<u8>> {
  csv::WriterBuilder::new()
    .flexible(true)
    .from_writer(Vec::new())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
  wtr.into_inner().map_err(|e| e.into_error().into())
}

/// Title row, header row, data rows; one blank line between sections.
fn write_sectioned(report: &Report) -> Result<Vec<u8>> {
  let mut out = Vec::new();

  for (i, section) in report.sections.iter().enumerate() {
    if i > 0 {
      out.push(b'\n');
    }
    let mut wtr = writer();
    wtr.write_record([section.title.as_str()])?;
    wtr.write_record(&section.columns)?;
    for row in &section.rows {
      wtr.write_record(row.iter().map(|c| c.plain()))?;
    }
    out.extend(finish(wtr)?);
  }

  Ok(out)
}

/// A single table: `Type`, the common columns and (when enabled) `Company`.
fn write_flat(report: &Report) -> Result<Vec<u8>> {
  let mut wtr = writer();

  let mut header: Vec<&str> = vec!["Type"];
  header.extend(COMMON_COLUMNS);
  if report.options.include_company {
    header.push("Company");
  }
  wtr.write_record(&header)?;

  for section in &report.sections {
    let label = PolicyType::label(section.policy_type);
    for row in &section.rows {
      let mut record = vec![label.to_owned()];
      record.extend(row.iter().take(COMMON_COLUMNS.len()).map(|c| c.plain()));
      if report.options.include_company {
        record.push(row.last().map(|c| c.plain()).unwrap_or_default());
      }
      wtr.write_record(&record)?;
    }
  }

  finish(wtr)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::report::{CsvLayout, test_helpers::*};

  fn render(report: &Report) -> String { String::from_utf8(write_csv(report).unwrap()).unwrap() }

  #[test]
  fn sectioned_layout() {
    let input = [health("H-1", 18_500), commercial("C-1", 40_000)];
    let report = Report::build(&input, options()).unwrap();
    let text = render(&report);

    let expected = "\
Health Policies
Policy Number,Insurer,Premium,Status,Start Date,End Date,Sum Insured,Lives Covered,Plan
H-1,Star Health,18500,Active,2025-01-01,2025-12-31,500000,2,

Commercial Policies
Policy Number,Insurer,Premium,Status,Start Date,End Date,LOB,Business Name
C-1,Star Health,40000,Active,2025-01-01,2025-12-31,GPA,Acme Traders
";
    assert_eq!(text, expected);
  }

  #[test]
  fn sections_are_separated_by_one_blank_line() {
    let one = Report::build(&[motor("M-1", 12_000)], options()).unwrap();
    let text = render(&one);
    assert!(text.starts_with("Motor Policies\n"));
    assert!(!text.contains("\n\n"));

    let input = [motor("M-1", 12_000), health("H-1", 18_500), commercial("C-1", 40_000)];
    let three = render(&Report::build(&input, options()).unwrap());
    assert_eq!(three.matches("\n\n").count(), 2);
    assert!(!three.ends_with("\n\n"));
  }

  #[test]
  fn flat_layout_leads_with_type() {
    let mut opts = options();
    opts.csv_layout = CsvLayout::Flat;
    opts.include_company = true;
    let input = [motor("M-1", 12_000), health("H-1", 18_500)];
    let report = Report::build(&input, opts).unwrap();
    let text = render(&report);

    let mut lines = text.lines();
    assert_eq!(
      lines.next(),
      Some("Type,Policy Number,Insurer,Premium,Status,Start Date,End Date,Company")
    );
    assert_eq!(
      lines.next(),
      Some("Motor,M-1,Star Health,12000,Active,2025-01-01,2025-12-31,Acme")
    );
    assert_eq!(
      lines.next(),
      Some("Health,H-1,Star Health,18500,Active,2025-01-01,2025-12-31,Acme")
    );
    assert_eq!(lines.next(), None);
  }

  #[test]
  fn fields_with_commas_are_quoted() {
    let mut p = health("H-1", 100);
    p.policy.insurer = "Tata AIG, General".into();
    let report = Report::build(&[p], options()).unwrap();
    assert!(render(&report).contains("H-1,\"Tata AIG, General\",100,"));
  }
}
