//! HTTP Basic-auth extractor backed by the store's user accounts.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use polis_core::{store::PolicyStore, user::CurrentUser};
use rand_core::OsRng;
use tracing::debug;

use crate::{AppState, error::ApiError};

/// Present in a handler's arguments means the request carried valid
/// credentials. Wraps the account they belong to.
#[derive(Debug, Clone)]
pub struct Authenticated(pub CurrentUser);

impl Authenticated {
  /// Reject callers who are not administrators.
  pub fn require_admin(&self) -> Result<&CurrentUser, ApiError> {
    if self.0.is_admin() {
      Ok(&self.0)
    } else {
      Err(ApiError::Forbidden("administrator role required".into()))
    }
  }
}

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// Split a `Basic` authorization header into `(username, password)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let encoded = value.strip_prefix("Basic ")?;
  let decoded = B64.decode(encoded).ok()?;
  let creds = String::from_utf8(decoded).ok()?;
  let (user, pass) = creds.split_once(':')?;
  Some((user.to_owned(), pass.to_owned()))
}

fn verify(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: PolicyStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers).ok_or(ApiError::Unauthorized)?;

    let account = state
      .store
      .find_user_by_email(&email)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    if !verify(&password, &account.password_hash) {
      debug!(%email, "rejected credentials");
      return Err(ApiError::Unauthorized);
    }
    Ok(Authenticated(account.user))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn hashes_verify() {
    let phc = hash_password("secret").unwrap();
    assert!(verify("secret", &phc));
    assert!(!verify("wrong", &phc));
    assert!(!verify("secret", "not-a-phc-string"));
  }

  #[test]
  fn parses_basic_header() {
    let mut headers = HeaderMap::new();
    let value = format!("Basic {}", B64.encode("a@b.test:pa:ss"));
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
    assert_eq!(
      basic_credentials(&headers),
      Some(("a@b.test".to_owned(), "pa:ss".to_owned()))
    );
  }

  #[test]
  fn rejects_malformed_headers() {
    let mut headers = HeaderMap::new();
    assert_eq!(basic_credentials(&headers), None);
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!not-base64!!!"));
    assert_eq!(basic_credentials(&headers), None);
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert_eq!(basic_credentials(&headers), None);
  }
}
