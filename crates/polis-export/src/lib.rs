//! Report export for Polis.
//!
//! Turns a filtered, classified set of policies into a report grouped by
//! product line, then into one of three artifacts: CSV bytes, a workbook
//! model, or a paginated PDF layout. Pure synchronous; no HTTP or database
//! dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use polis_export::{ExportFormat, ReportOptions, serialize};
//!
//! # let policies: Vec<polis_core::status::ClassifiedPolicy> = vec![];
//! let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//! let artifact = serialize(&policies, ExportFormat::Csv, ReportOptions::new("Policies", today));
//! ```

mod delimited;
pub mod error;
pub mod format;
pub mod pdf;
pub mod report;
pub mod workbook;

pub use error::{Error, Result};
pub use format::{CurrencyFormat, ExportFormat, export_filename, format_currency};
pub use pdf::PdfDocument;
pub use report::{CsvLayout, Report, ReportOptions};
pub use workbook::Workbook;

use polis_core::status::ClassifiedPolicy;

/// A serialized report.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
  Csv(Vec<u8>),
  Workbook(Workbook),
  Pdf(PdfDocument),
}

impl Artifact {
  pub fn format(&self) -> ExportFormat {
    match self {
      Self::Csv(_) => ExportFormat::Csv,
      Self::Workbook(_) => ExportFormat::Xlsx,
      Self::Pdf(_) => ExportFormat::Pdf,
    }
  }
}

/// Build the report for `policies` and render it as `format`.
///
/// Fails with [`Error::EmptyReport`] rather than producing a blank file.
pub fn serialize(
  policies: &[ClassifiedPolicy],
  format: ExportFormat,
  options: ReportOptions,
) -> Result<Artifact> {
  let report = Report::build(policies, options)?;
  Ok(match format {
    ExportFormat::Csv => Artifact::Csv(delimited::write_csv(&report)?),
    ExportFormat::Xlsx => Artifact::Workbook(Workbook::from_report(&report)),
    ExportFormat::Pdf => Artifact::Pdf(PdfDocument::from_report(&report)),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::report::test_helpers::*;

  #[test]
  fn empty_selection_never_yields_a_file() {
    for format in [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Pdf] {
      assert!(matches!(serialize(&[], format, options()), Err(Error::EmptyReport)));
    }
  }

  #[test]
  fn artifact_matches_requested_format() {
    let input = [health("H-1", 1)];
    for format in [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Pdf] {
      assert_eq!(serialize(&input, format, options()).unwrap().format(), format);
    }
  }
}
