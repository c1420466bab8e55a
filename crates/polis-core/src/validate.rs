//! Input validation that runs before any storage call.

use rust_decimal::Decimal;

use crate::{
  Error, Result,
  error::FieldError,
  policy::{NewPolicy, PolicyDetails},
};

/// Normalise a policy number for comparison and storage.
pub fn normalize_policy_number(raw: &str) -> String { raw.trim().to_owned() }

/// Check `input`, collecting every violation rather than stopping at the
/// first.
pub fn validate_new_policy(input: &NewPolicy) -> Result<()> {
  let mut errors = Vec::new();

  if input.policy_number.trim().is_empty() {
    errors.push(FieldError::new("policy_number", "policy number is required"));
  }
  if input.insurer.trim().is_empty() {
    errors.push(FieldError::new("insurer", "insurer is required"));
  }
  if input.premium_amount <= Decimal::ZERO {
    errors.push(FieldError::new(
      "premium_amount",
      "premium must be greater than zero",
    ));
  }
  if let (Some(start), Some(end)) = (input.policy_start_date, input.policy_end_date)
    && end < start
  {
    errors.push(FieldError::new(
      "policy_end_date",
      "end date cannot be before start date",
    ));
  }

  match &input.details {
    PolicyDetails::Motor(m) => {
      if !is_valid_vehicle_number(&m.vehicle_number) {
        errors.push(FieldError::new(
          "vehicle_number",
          format!("{:?} is not a valid registration number", m.vehicle_number),
        ));
      }
    }
    PolicyDetails::Health(h) => {
      if h.lives_covered == Some(0) {
        errors.push(FieldError::new(
          "lives_covered",
          "at least one life must be covered",
        ));
      }
    }
    _ => {}
  }

  if errors.is_empty() {
    Ok(())
  } else {
    Err(Error::Validation(errors))
  }
}

/// Registration numbers of the form `AA 00 A{0,3} 0000`: a two-letter state
/// code, a one- or two-digit district, up to three series letters and a
/// four-digit number. Spaces and hyphens are ignored; case is ignored.
pub fn is_valid_vehicle_number(raw: &str) -> bool {
  let s: Vec<char> = raw
    .chars()
    .filter(|c| !matches!(c, ' ' | '-'))
    .map(|c| c.to_ascii_uppercase())
    .collect();

  if s.len() < 7 || s.len() > 11 {
    return false;
  }

  let (state, rest) = s.split_at(2);
  if !state.iter().all(char::is_ascii_uppercase) {
    return false;
  }

  let (middle, number) = rest.split_at(rest.len() - 4);
  if !number.iter().all(char::is_ascii_digit) {
    return false;
  }

  let district = middle.iter().take_while(|c| c.is_ascii_digit()).count();
  let series = &middle[district..];
  (1..=2).contains(&district)
    && series.len() <= 3
    && series.iter().all(char::is_ascii_uppercase)
}

/// Check a reporting date range.
pub fn validate_date_range(
  from: Option<chrono::NaiveDate>,
  to: Option<chrono::NaiveDate>,
) -> Result<()> {
  match (from, to) {
    (Some(f), Some(t)) if t < f => Err(Error::Validation(vec![FieldError::new(
      "to",
      "end of range cannot be before its start",
    )])),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use uuid::Uuid;

  use super::*;
  use crate::policy::{HealthDetails, MotorDetails};

  fn motor(number: &str) -> NewPolicy {
    NewPolicy::new(
      Uuid::nil(),
      "POL-1",
      "ICICI Lombard",
      Decimal::from(12000),
      PolicyDetails::Motor(MotorDetails {
        vehicle_number: number.into(),
        ..Default::default()
      }),
    )
  }

  fn fields(err: Error) -> Vec<&'static str> {
    match err {
      Error::Validation(errs) => errs.into_iter().map(|e| e.field).collect(),
      other => panic!("expected validation error, got {other:?}"),
    }
  }

  #[test]
  fn vehicle_numbers() {
    for ok in ["MH12AB1234", "mh 12 ab 1234", "DL-3C-1234", "KA011234", "TN9ABC0001"] {
      assert!(is_valid_vehicle_number(ok), "{ok} should be valid");
    }
    for bad in ["", "1234", "M12AB1234", "MH123AB1234", "MHAB1234", "MH12ABCD1234", "MH12AB123"] {
      assert!(!is_valid_vehicle_number(bad), "{bad} should be invalid");
    }
  }

  #[test]
  fn valid_motor_passes() {
    assert!(validate_new_policy(&motor("MH12AB1234")).is_ok());
  }

  #[test]
  fn all_violations_are_reported() {
    let mut input = motor("nope");
    input.policy_number = "  ".into();
    input.premium_amount = Decimal::ZERO;
    input.policy_start_date = NaiveDate::from_ymd_opt(2025, 1, 1);
    input.policy_end_date = NaiveDate::from_ymd_opt(2024, 12, 31);

    let got = fields(validate_new_policy(&input).unwrap_err());
    assert_eq!(
      got,
      vec!["policy_number", "premium_amount", "policy_end_date", "vehicle_number"]
    );
  }

  #[test]
  fn negative_premium_rejected() {
    let mut input = motor("MH12AB1234");
    input.premium_amount = Decimal::from(-1);
    assert_eq!(fields(validate_new_policy(&input).unwrap_err()), vec!["premium_amount"]);
  }

  #[test]
  fn zero_lives_rejected() {
    let input = NewPolicy::new(
      Uuid::nil(),
      "H-1",
      "Star Health",
      Decimal::from(9000),
      PolicyDetails::Health(HealthDetails {
        lives_covered: Some(0),
        ..Default::default()
      }),
    );
    assert_eq!(fields(validate_new_policy(&input).unwrap_err()), vec!["lives_covered"]);
  }

  #[test]
  fn inverted_range_rejected() {
    let a = NaiveDate::from_ymd_opt(2025, 2, 1);
    let b = NaiveDate::from_ymd_opt(2025, 1, 1);
    assert!(validate_date_range(a, b).is_err());
    assert!(validate_date_range(b, a).is_ok());
    assert!(validate_date_range(None, a).is_ok());
  }
}
