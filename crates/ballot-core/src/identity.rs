//! Identity: one registered, eligible voter.
//!
//! An identity is created on registration and never destroyed. Its only
//! mutation is the one-way `has_voted` transition performed by the
//! submission pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Numeric primary key of an identity.
pub type VoterId = i64;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A registered voter as persisted by a [`CredentialStore`](crate::store::CredentialStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
  pub voter_id:      VoterId,
  /// Normalized (trimmed, lowercase) and unique across identities.
  pub email:         String,
  /// Argon2 PHC string; never the plaintext.
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub full_name:     Option<String>,
  pub has_voted:     bool,
  pub is_admin:      bool,
  pub created_at:    DateTime<Utc>,
  /// Non-null iff `has_voted` is true.
  pub voted_at:      Option<DateTime<Utc>>,
}

/// Input to [`CredentialStore::create_identity`](crate::store::CredentialStore::create_identity).
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub email:         String,
  pub password_hash: String,
  pub full_name:     Option<String>,
  pub is_admin:      bool,
}

impl NewIdentity {
  /// A regular (non-admin) voter. `email` is normalized here.
  pub fn voter(
    email: &str,
    password_hash: impl Into<String>,
    full_name: Option<String>,
  ) -> Self {
    Self {
      email: normalize_email(email),
      password_hash: password_hash.into(),
      full_name: full_name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty()),
      is_admin: false,
    }
  }

  pub fn admin(self) -> Self { Self { is_admin: true, ..self } }
}

/// Trim and lowercase an email address.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// Check registration credentials before any hashing or storage happens.
///
/// `email` is expected to be normalized already.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
  if email.is_empty() || password.is_empty() {
    return Err(Error::MissingCredentials);
  }
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
    _ => return Err(Error::InvalidEmail(email.to_owned())),
  }
  if email.chars().any(char::is_whitespace) {
    return Err(Error::InvalidEmail(email.to_owned()));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::PasswordTooShort(MIN_PASSWORD_LEN));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_case_and_whitespace() {
    assert_eq!(normalize_email("  Alice@Example.COM \n"), "alice@example.com");
  }

  #[test]
  fn voter_constructor_normalizes_and_drops_blank_names() {
    let id = NewIdentity::voter(" Bob@Example.com", "hash", Some("   ".into()));
    assert_eq!(id.email, "bob@example.com");
    assert!(id.full_name.is_none());
    assert!(!id.is_admin);
    assert!(id.admin().is_admin);
  }

  #[test]
  fn rejects_missing_fields() {
    assert!(matches!(
      validate_credentials("", "password123"),
      Err(Error::MissingCredentials)
    ));
    assert!(matches!(
      validate_credentials("a@b.c", ""),
      Err(Error::MissingCredentials)
    ));
  }

  #[test]
  fn rejects_malformed_email() {
    for bad in ["alice", "@example.com", "alice@", "al ice@example.com"] {
      assert!(
        matches!(validate_credentials(bad, "password123"), Err(Error::InvalidEmail(_))),
        "{bad} should be rejected"
      );
    }
  }

  #[test]
  fn enforces_minimum_password_length() {
    assert!(matches!(
      validate_credentials("alice@example.com", "short"),
      Err(Error::PasswordTooShort(MIN_PASSWORD_LEN))
    ));
    assert!(validate_credentials("alice@example.com", "password123").is_ok());
  }
}
