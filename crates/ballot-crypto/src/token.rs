//! Session tokens: HS256-signed JWTs with a fixed 24-hour validity.
//!
//! Tokens are self-contained and not stored server-side. Claims are trusted
//! only after both the signature and the expiry have been checked. There is
//! no revocation list; a leaked token stays valid until it expires.

use std::collections::HashSet;

use ballot_core::identity::VoterId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How long an issued token stays valid.
pub const TOKEN_VALIDITY_HOURS: i64 = 24;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub voter_id: VoterId,
  pub email:    String,
  #[serde(default)]
  pub is_admin: bool,
  /// Issued-at, seconds since the Unix epoch.
  pub iat:      i64,
  /// Expiry, seconds since the Unix epoch.
  pub exp:      i64,
}

/// Issues and verifies session tokens under one server secret.
#[derive(Clone)]
pub struct TokenAuthority {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
}

impl std::fmt::Debug for TokenAuthority {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokenAuthority").field("secret", &"<redacted>").finish()
  }
}

impl TokenAuthority {
  pub fn new(secret: &[u8]) -> Self {
    // Expiry is checked by hand in `verify_at` so the clock can be injected
    // and the boundary is exact (no leeway).
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.required_spec_claims = HashSet::from(["exp".to_owned(), "iat".to_owned()]);

    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
    }
  }

  /// Issue a token valid for [`TOKEN_VALIDITY_HOURS`] from now.
  pub fn issue(&self, voter_id: VoterId, email: &str, is_admin: bool) -> Result<String> {
    self.issue_at(voter_id, email, is_admin, Utc::now())
  }

  pub fn issue_at(
    &self,
    voter_id: VoterId,
    email: &str,
    is_admin: bool,
    now: DateTime<Utc>,
  ) -> Result<String> {
    let claims = Claims {
      voter_id,
      email: email.to_owned(),
      is_admin,
      iat: now.timestamp(),
      exp: (now + Duration::hours(TOKEN_VALIDITY_HOURS)).timestamp(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(Error::TokenSigning)
  }

  /// Verify a token against the current time.
  pub fn verify(&self, token: &str) -> Result<Claims> { self.verify_at(token, Utc::now()) }

  /// Verify signature and structure, then reject if `now` is past `exp`.
  pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
    let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map_err(|_| Error::TokenInvalid)?;
    let claims = data.claims;
    if now.timestamp() > claims.exp {
      return Err(Error::TokenExpired);
    }
    Ok(claims)
  }
}
