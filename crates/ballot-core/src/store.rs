//! The `CredentialStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `ballot-store-sqlite`).
//! The server and the submission pipeline depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  audit::{AuditEntry, NewAuditEntry},
  identity::{Identity, NewIdentity, VoterId},
};

/// Result of [`CredentialStore::create_identity`].
#[derive(Debug, Clone)]
pub enum CreateOutcome {
  Created(Identity),
  /// Another identity already owns the (normalized) email.
  EmailTaken,
}

/// Parameters for [`CredentialStore::list_audit`].
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
  /// Restrict to entries bound to this identity.
  pub voter_id: Option<VoterId>,
  pub limit:    Option<usize>,
}

/// Abstraction over the durable credential store.
///
/// The store is the single source of truth for the one-vote invariant: no
/// implementation may cache `has_voted` in memory.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CredentialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  /// Persist a new identity. Emails are compared in normalized form.
  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<CreateOutcome, Self::Error>> + Send + '_;

  fn find_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  fn find_by_id(
    &self,
    id: VoterId,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Compare-and-set `has_voted` from false to true, stamping `voted_at`.
  ///
  /// Returns `true` only for the single call that performed the transition;
  /// every later (or concurrently losing) call returns `false`.
  fn mark_voted(
    &self,
    id: VoterId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn count_identities(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn count_voted(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Audit log (append-only) ──────────────────────────────────────────

  /// Append an entry; `recorded_at` is set by the store.
  fn append_audit(
    &self,
    entry: NewAuditEntry,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  /// Entries in canonical order: `recorded_at`, then insertion order.
  fn list_audit<'a>(
    &'a self,
    query: &'a AuditQuery,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + 'a;
}
