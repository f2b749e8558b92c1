//! Error type for `ballot-crypto`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Authentication of an envelope failed: wrong key, corrupted or truncated
  /// ciphertext, or an envelope that is not base64 at all.
  #[error("vote envelope failed authentication")]
  Tamper,

  #[error("vote encryption failed")]
  Encrypt,

  #[error("token has expired")]
  TokenExpired,

  #[error("invalid token")]
  TokenInvalid,

  #[error("token signing failed: {0}")]
  TokenSigning(#[source] jsonwebtoken::errors::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
