//! Error type for `polis-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] polis_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {kind} value: {value:?}")]
  UnknownTag { kind: &'static str, value: String },

  /// A patch tried to move a policy to a different product line.
  #[error("policy {0} cannot change product line")]
  PolicyTypeChange(uuid::Uuid),

  /// A patch tried to take a number already held by another of the
  /// customer's policies.
  #[error("policy number {0:?} is already in use")]
  PolicyNumberTaken(String),

  #[error("email {0:?} is already registered")]
  EmailTaken(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
