//! Password hashing and bearer-token extractors.
//!
//! Handlers never see a raw `Authorization` header: they take
//! [`AuthenticatedVoter`] or [`AdminVoter`], which resolve and verify the token
//! before the handler body runs.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use ballot_core::store::CredentialStore;
use ballot_crypto::Claims;
use ballot_engine::EngineChannel;
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

// ─── Passwords ────────────────────────────────────────────────────────────────

/// Produce an argon2 PHC string for `password` with a fresh random salt.
///
/// CPU-bound; call from `spawn_blocking` inside request handlers.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Bearer tokens ────────────────────────────────────────────────────────────

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// A bare token without a scheme is also accepted.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .ok_or(ApiError::MissingToken)?
    .to_str()
    .map_err(|_| ApiError::InvalidToken)?
    .trim();

  let token = match value.split_once(' ') {
    Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
    Some(_) => return Err(ApiError::InvalidToken),
    None => value,
  };

  if token.is_empty() {
    return Err(ApiError::MissingToken);
  }
  Ok(token)
}

/// The raw bearer token, unverified. Used by the vote route, where
/// verification is the first stage of the submission pipeline.
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
    bearer_token(&parts.headers).map(|t| BearerToken(t.to_owned()))
  }
}

/// A request carrying a valid, unexpired token.
pub struct AuthenticatedVoter(pub Claims);

impl<S, E> FromRequestParts<AppState<S, E>> for AuthenticatedVoter
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, E>,
  ) -> Result<Self, Self::Rejection> {
    let token  = bearer_token(&parts.headers)?;
    let claims = state.tokens.verify(token)?;
    Ok(AuthenticatedVoter(claims))
  }
}

/// A valid token whose claims carry `is_admin`.
pub struct AdminVoter(pub Claims);

impl<S, E> FromRequestParts<AppState<S, E>> for AdminVoter
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, E>,
  ) -> Result<Self, Self::Rejection> {
    let AuthenticatedVoter(claims) =
      AuthenticatedVoter::from_request_parts(parts, state).await?;
    if !claims.is_admin {
      tracing::warn!(voter_id = claims.voter_id, "admin route refused");
      return Err(ApiError::Forbidden);
    }
    Ok(AdminVoter(claims))
  }
}
