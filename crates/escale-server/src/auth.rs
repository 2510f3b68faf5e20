//! Passwords, session tokens and the request-authentication extractors.
//!
//! A request authenticates with either `Authorization: Bearer <token>` (a
//! session issued by `/auth/login`) or `Authorization: Basic` with the
//! account's email and password.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::Utc;
use escale_core::{account::normalize_email, store::MarketplaceStore, user::User};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

use crate::{
  AppState,
  error::{Error, Result, store},
};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Internal(format!("argon2: {e}")))
}

/// Check a password against a stored PHC string. Unparseable hashes never
/// verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

// ─── Session tokens ──────────────────────────────────────────────────────────

/// A freshly minted bearer token and the digest the store keeps.
pub struct IssuedToken {
  pub token:      String,
  pub token_hash: String,
}

pub fn new_session_token() -> IssuedToken {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = hex::encode(bytes);
  let token_hash = token_digest(&token);
  IssuedToken { token, token_hash }
}

/// Hex SHA-256 of a bearer token.
pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// The bearer token of a request, if it carries one.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Request authentication ──────────────────────────────────────────────────

/// Resolve the caller from the `Authorization` header. `Ok(None)` when the
/// header is absent; `Err(Unauthorized)` when credentials are present but
/// wrong.
async fn authenticate<S>(headers: &HeaderMap, state: &AppState<S>) -> Result<Option<User>>
where
  S: MarketplaceStore,
{
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let value = value.to_str().map_err(|_| Error::Unauthorized)?;

  if let Some(token) = value.strip_prefix("Bearer ") {
    let user = state
      .store
      .session_user(&token_digest(token.trim()), Utc::now())
      .await
      .map_err(store)?
      .ok_or(Error::Unauthorized)?;
    return Ok(Some(user));
  }

  let encoded = value.strip_prefix("Basic ").ok_or(Error::Unauthorized)?;
  let decoded = B64.decode(encoded.trim()).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;
  let (email, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let user = state
    .store
    .get_user_by_email(&normalize_email(email))
    .await
    .map_err(store)?
    .filter(|u| verify_password(password, &u.password_hash))
    .ok_or(Error::Unauthorized)?;
  Ok(Some(user))
}

/// Present in a handler means the request carried valid credentials.
pub struct Authenticated(pub User);

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: MarketplaceStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state)
      .await?
      .map(Authenticated)
      .ok_or(Error::Unauthorized)
  }
}

/// Like [`Authenticated`] for endpoints that also serve anonymous visitors.
/// Bad credentials are treated as anonymous.
pub struct MaybeAuthenticated(pub Option<User>);

impl<S> FromRequestParts<AppState<S>> for MaybeAuthenticated
where
  S: MarketplaceStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    match authenticate(&parts.headers, state).await {
      Ok(user) => Ok(MaybeAuthenticated(user)),
      Err(Error::Unauthorized) => Ok(MaybeAuthenticated(None)),
      Err(e) => Err(e),
    }
  }
}
