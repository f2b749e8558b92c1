//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order equals chronological order.

use std::str::FromStr as _;

use ballot_core::{
  audit::{AuditAction, AuditEntry},
  identity::Identity,
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AuditAction ──────────────────────────────────────────────────────────────

pub fn encode_action(a: AuditAction) -> &'static str {
  match a {
    AuditAction::Register => "REGISTER",
    AuditAction::Login => "LOGIN",
    AuditAction::LoginFailed => "LOGIN_FAILED",
    AuditAction::VoteCast => "VOTE_CAST",
    AuditAction::VoteFailed => "VOTE_FAILED",
    AuditAction::VoteDuplicate => "VOTE_DUPLICATE",
  }
}

pub fn decode_action(s: &str) -> Result<AuditAction> {
  AuditAction::from_str(s)
    .map_err(|_| Error::Core(ballot_core::Error::UnknownAuditAction(s.to_owned())))
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// Column list matching [`RawIdentity::from_row`].
pub const IDENTITY_COLUMNS: &str =
  "voter_id, email, password_hash, full_name, has_voted, is_admin, created_at, voted_at";

/// A `voters` row as read from SQLite, before timestamp decoding.
pub struct RawIdentity {
  pub voter_id:      i64,
  pub email:         String,
  pub password_hash: String,
  pub full_name:     Option<String>,
  pub has_voted:     bool,
  pub is_admin:      bool,
  pub created_at:    String,
  pub voted_at:      Option<String>,
}

impl RawIdentity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      voter_id:      row.get(0)?,
      email:         row.get(1)?,
      password_hash: row.get(2)?,
      full_name:     row.get(3)?,
      has_voted:     row.get(4)?,
      is_admin:      row.get(5)?,
      created_at:    row.get(6)?,
      voted_at:      row.get(7)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    let voted_at = self.voted_at.as_deref().map(decode_dt).transpose()?;
    if self.has_voted && voted_at.is_none() {
      return Err(Error::MissingVotedAt(self.voter_id));
    }
    Ok(Identity {
      voter_id:      self.voter_id,
      email:         self.email,
      password_hash: self.password_hash,
      full_name:     self.full_name,
      has_voted:     self.has_voted,
      is_admin:      self.is_admin,
      created_at:    decode_dt(&self.created_at)?,
      voted_at,
    })
  }
}

/// Column list matching [`RawAuditEntry::from_row`].
pub const AUDIT_COLUMNS: &str = "audit_id, voter_id, action, detail, origin, recorded_at";

pub struct RawAuditEntry {
  pub audit_id:    i64,
  pub voter_id:    Option<i64>,
  pub action:      String,
  pub detail:      Option<String>,
  pub origin:      Option<String>,
  pub recorded_at: String,
}

impl RawAuditEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      audit_id:    row.get(0)?,
      voter_id:    row.get(1)?,
      action:      row.get(2)?,
      detail:      row.get(3)?,
      origin:      row.get(4)?,
      recorded_at: row.get(5)?,
    })
  }

  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      audit_id:    self.audit_id,
      voter_id:    self.voter_id,
      action:      decode_action(&self.action)?,
      detail:      self.detail,
      origin:      self.origin,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
