//! Error types for `ballot-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("email and password required")]
  MissingCredentials,

  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("password must be at least {0} characters")]
  PasswordTooShort(usize),

  #[error("unknown audit action: {0:?}")]
  UnknownAuditAction(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
