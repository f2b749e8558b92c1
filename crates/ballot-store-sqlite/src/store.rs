//! [`SqliteStore`]: the SQLite implementation of [`CredentialStore`].

use std::path::Path;

use ballot_core::{
  audit::{AuditEntry, NewAuditEntry},
  identity::{Identity, NewIdentity, VoterId, normalize_email},
  store::{AuditQuery, CreateOutcome, CredentialStore},
};
use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension as _};

use crate::{
  Result,
  encode::{
    AUDIT_COLUMNS, IDENTITY_COLUMNS, RawAuditEntry, RawIdentity, encode_action,
    encode_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A credential store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls are
/// executed in order on one connection thread, and every one-vote transition
/// is a single conditional `UPDATE`.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_where(&self, sql: &'static str) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
      .await?;
    Ok(n.max(0) as u64)
  }
}

// ─── CredentialStore impl ────────────────────────────────────────────────────

impl CredentialStore for SqliteStore {
  type Error = crate::Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn create_identity(&self, input: NewIdentity) -> Result<CreateOutcome> {
    let email      = normalize_email(&input.email);
    let created_at = Utc::now();
    let at_str     = encode_dt(created_at);

    let inserted: Option<i64> = self
      .conn
      .call({
        let email         = email.clone();
        let password_hash = input.password_hash.clone();
        let full_name     = input.full_name.clone();
        let is_admin      = input.is_admin;
        move |conn| {
          let res = conn.execute(
            "INSERT INTO voters (email, password_hash, full_name, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![email, password_hash, full_name, is_admin, at_str],
          );
          match res {
            Ok(_) => Ok(Some(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(e, _))
              if e.code == ErrorCode::ConstraintViolation =>
            {
              Ok(None)
            }
            Err(e) => Err(e.into()),
          }
        }
      })
      .await?;

    let Some(voter_id) = inserted else {
      tracing::debug!(%email, "registration rejected: email already present");
      return Ok(CreateOutcome::EmailTaken);
    };

    Ok(CreateOutcome::Created(Identity {
      voter_id,
      email,
      password_hash: input.password_hash,
      full_name: input.full_name,
      has_voted: false,
      is_admin: input.is_admin,
      created_at,
      voted_at: None,
    }))
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
    let email = normalize_email(email);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM voters WHERE email = ?1"),
            rusqlite::params![email],
            RawIdentity::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn find_by_id(&self, id: VoterId) -> Result<Option<Identity>> {
    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM voters WHERE voter_id = ?1"),
            rusqlite::params![id],
            RawIdentity::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn mark_voted(&self, id: VoterId) -> Result<bool> {
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE voters SET has_voted = 1, voted_at = ?2
           WHERE voter_id = ?1 AND has_voted = 0",
          rusqlite::params![id, at_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn count_identities(&self) -> Result<u64> {
    self.count_where("SELECT COUNT(*) FROM voters").await
  }

  async fn count_voted(&self) -> Result<u64> {
    self
      .count_where("SELECT COUNT(*) FROM voters WHERE has_voted = 1")
      .await
  }

  // ── Audit log ─────────────────────────────────────────────────────────────

  async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
    let recorded_at = Utc::now();
    let at_str      = encode_dt(recorded_at);
    let action_str  = encode_action(entry.action);
    let voter_id    = entry.voter_id;
    let detail      = entry.detail.clone();
    let origin      = entry.origin.clone();

    let audit_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_log (voter_id, action, detail, origin, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![voter_id, action_str, detail, origin, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(AuditEntry {
      audit_id,
      voter_id:    entry.voter_id,
      action:      entry.action,
      detail:      entry.detail,
      origin:      entry.origin,
      recorded_at,
    })
  }

  async fn list_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
    // With a limit, the *latest* `limit` entries are returned, still in
    // canonical (ascending) order.
    let voter_id  = query.voter_id;
    let limit_val = query.limit.map_or(-1, |l| l as i64);

    let mut raws: Vec<RawAuditEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {AUDIT_COLUMNS} FROM audit_log
           WHERE (?1 IS NULL OR voter_id = ?1)
           ORDER BY recorded_at DESC, audit_id DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![voter_id, limit_val], RawAuditEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.reverse();
    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }
}
