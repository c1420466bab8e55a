//! Error types for the polis-export serializer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Nothing matched the caller's filters. Reported instead of writing an
  /// empty file.
  #[error("no policies to export")]
  EmptyReport,

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
