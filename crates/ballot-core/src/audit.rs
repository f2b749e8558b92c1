//! Audit entries: the append-only trail of security-relevant actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::identity::VoterId;

/// What happened. Stored as its SCREAMING_SNAKE_CASE name.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
  Register,
  Login,
  LoginFailed,
  VoteCast,
  VoteFailed,
  VoteDuplicate,
}

/// A persisted audit record. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub audit_id:    i64,
  /// `None` for anonymous actions (e.g. a login attempt for an unknown email).
  pub voter_id:    Option<VoterId>,
  pub action:      AuditAction,
  pub detail:      Option<String>,
  /// Remote address of the request that caused the entry.
  pub origin:      Option<String>,
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`CredentialStore::append_audit`](crate::store::CredentialStore::append_audit).
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
  pub voter_id: Option<VoterId>,
  pub action:   AuditAction,
  pub detail:   Option<String>,
  pub origin:   Option<String>,
}

impl NewAuditEntry {
  pub fn new(voter_id: Option<VoterId>, action: AuditAction) -> Self {
    Self { voter_id, action, detail: None, origin: None }
  }

  pub fn detail(mut self, detail: impl Into<String>) -> Self {
    self.detail = Some(detail.into());
    self
  }

  pub fn origin(mut self, origin: impl Into<String>) -> Self {
    self.origin = Some(origin.into());
    self
  }
}
