//! Paginated PDF layout.
//!
//! Produces the page structure a PDF renderer draws: which rows land on which
//! page, with section headers repeated on continuation pages and a
//! `Page N of M` footer. Amounts are pre-formatted strings.

use serde::{Deserialize, Serialize};

use crate::report::Report;

/// Rows per page for a landscape A4 table at the default font size.
pub const DEFAULT_ROWS_PER_PAGE: usize = 28;

/// Row slots a section's title and column header occupy.
const HEADER_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfBlock {
  pub section:   String,
  /// This block carries on a section begun on an earlier page.
  pub continued: bool,
  pub columns:   Vec<String>,
  pub rows:      Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfPage {
  pub number: usize,
  pub blocks: Vec<PdfBlock>,
  pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfDocument {
  pub title:        String,
  pub generated_on: String,
  /// Label/value pairs printed under the title.
  pub summary:      Vec<(String, String)>,
  pub pages:        Vec<PdfPage>,
}

impl PdfDocument {
  pub fn from_report(report: &Report) -> Self { Self::paginate(report, DEFAULT_ROWS_PER_PAGE) }

  /// Lay out `report` with at most `rows_per_page` slots per page. A section
  /// header costs two slots and is never left at the bottom of a page without
  /// at least one of its rows.
  pub fn paginate(report: &Report, rows_per_page: usize) -> Self {
    let budget = rows_per_page.max(HEADER_ROWS + 1);
    let currency = &report.options.currency;

    let mut pages: Vec<Vec<PdfBlock>> = vec![Vec::new()];
    let mut used = 0;

    for section in &report.sections {
      let rendered: Vec<Vec<String>> = section
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.display(currency)).collect())
        .collect();
      let mut remaining = rendered.as_slice();
      let mut continued = false;

      while !remaining.is_empty() {
        if used > 0 && used + HEADER_ROWS + 1 > budget {
          pages.push(Vec::new());
          used = 0;
        }
        let room = budget - used - HEADER_ROWS;
        let (taken, rest) = remaining.split_at(room.min(remaining.len()));

        if let Some(page) = pages.last_mut() {
          page.push(PdfBlock {
            section: section.title.clone(),
            continued,
            columns: section.columns.clone(),
            rows: taken.to_vec(),
          });
        }
        used += HEADER_ROWS + taken.len();
        remaining = rest;
        continued = true;
      }
    }

    let total = pages.len();
    let pages = pages
      .into_iter()
      .enumerate()
      .map(|(i, blocks)| PdfPage {
        number: i + 1,
        blocks,
        footer: format!("Page {} of {total}", i + 1),
      })
      .collect();

    Self {
      title: report.options.title.clone(),
      generated_on: report.options.generated_on.format("%d %b %Y").to_string(),
      summary: vec![
        ("Total Policies".to_owned(), report.policy_count.to_string()),
        ("Total Premium".to_owned(), currency.format(report.total_premium)),
      ],
      pages,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::report::test_helpers::*;

  #[test]
  fn short_report_fits_one_page() {
    let report = Report::build(&[health("H-1", 150_000), motor("M-1", 1)], options()).unwrap();
    let doc = PdfDocument::from_report(&report);

    assert_eq!(doc.pages.len(), 1);
    assert_eq!(doc.pages[0].footer, "Page 1 of 1");
    assert_eq!(doc.pages[0].blocks.len(), 2);
    assert_eq!(doc.pages[0].blocks[1].rows[0][2], "₹1,50,000");
    assert_eq!(doc.summary[1].1, "₹1,50,001");
    assert_eq!(doc.generated_on, "01 Jun 2025");
  }

  #[test]
  fn long_section_repeats_header_on_next_page() {
    let input: Vec<_> = (0..7).map(|i| health(&format!("H-{i}"), 1_000)).collect();
    let report = Report::build(&input, options()).unwrap();
    // 2 header slots + 3 rows per page.
    let doc = PdfDocument::paginate(&report, 5);

    let per_page: Vec<usize> = doc.pages.iter().map(|p| p.blocks[0].rows.len()).collect();
    assert_eq!(per_page, [3, 3, 1]);
    assert!(!doc.pages[0].blocks[0].continued);
    assert!(doc.pages[1].blocks[0].continued);
    assert_eq!(doc.pages[1].blocks[0].columns, doc.pages[0].blocks[0].columns);
    assert_eq!(doc.pages[2].footer, "Page 3 of 3");
  }

  #[test]
  fn header_is_not_orphaned() {
    let input = [health("H-1", 1), health("H-2", 1), commercial("C-1", 1)];
    let report = Report::build(&input, options()).unwrap();
    // Health takes 4 slots; Commercial needs 3 more, only 1 left.
    let doc = PdfDocument::paginate(&report, 5);
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[1].blocks[0].section, "Commercial Policies");
    assert!(!doc.pages[1].blocks[0].continued);
  }
}
