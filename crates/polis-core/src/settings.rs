//! Administrator-managed system settings.

use serde::{Deserialize, Serialize};

use crate::status::{Classifier, DEFAULT_THRESHOLD_DAYS};

/// Digit grouping for rendered currency amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
  /// Lakh/crore grouping: `1,23,45,678`.
  #[default]
  Indian,
  /// Thousands grouping: `12,345,678`.
  Western,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
  /// Width of the Expiring Soon window. Every classification reads this value.
  pub expiry_threshold_days: u32,
  pub currency_symbol:       String,
  #[serde(default)]
  pub grouping:              Grouping,
}

impl Default for SystemSettings {
  fn default() -> Self {
    Self {
      expiry_threshold_days: DEFAULT_THRESHOLD_DAYS,
      currency_symbol:       "₹".to_owned(),
      grouping:              Grouping::Indian,
    }
  }
}

impl SystemSettings {
  pub fn classifier(&self) -> Classifier { Classifier::new(self.expiry_threshold_days) }
}
