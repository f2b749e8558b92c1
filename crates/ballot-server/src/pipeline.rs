//! The vote submission pipeline.
//!
//! A submission moves through
//! `Received → TokenVerified → Admitted → UnvotedChecked → Encrypted →
//! Relayed → Recorded`, leaving early for one of the terminal failures named
//! by [`SubmitError::terminal_state`]. Every exit after admission leaves an
//! audit entry.

use std::sync::Arc;

use ballot_core::{
  audit::{AuditAction, NewAuditEntry},
  identity::VoterId,
  store::CredentialStore,
};
use ballot_crypto::{TokenAuthority, VoteCipher, cipher::receipt};
use ballot_engine::{EngineChannel, EngineCommand, VoteReply, is_unavailable};
use dashmap::DashMap;
use strum::Display;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::admission::{AdmissionControl, RateLimited, Route};

// ─── States ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
  Received,
  TokenVerified,
  Admitted,
  UnvotedChecked,
  Encrypted,
  Relayed,
  Recorded,
}

/// Failure exits of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Terminal {
  TokenInvalid,
  RateLimited,
  AlreadyVoted,
  EngineRejected,
}

/// One submission as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct Ballot {
  pub token:   String,
  pub content: String,
  pub origin:  String,
}

/// A vote the engine accepted and the store marked.
#[derive(Debug, Clone)]
pub struct Recorded {
  pub voter_id: VoterId,
  /// SHA-256 of the envelope sent to the engine, hex encoded.
  pub receipt:  String,
}

#[derive(Debug, Error)]
pub enum SubmitError {
  #[error(transparent)]
  Token(ballot_crypto::Error),

  #[error(transparent)]
  RateLimited(#[from] RateLimited),

  #[error("ballot content is empty")]
  EmptyBallot,

  #[error("voter {0} not found")]
  UnknownVoter(VoterId),

  #[error("voter has already voted")]
  AlreadyVoted,

  #[error("tally engine unavailable: {0}")]
  EngineUnavailable(String),

  #[error("tally engine rejected the vote: {0}")]
  EngineRejected(String),

  #[error("vote encryption failed: {0}")]
  Cipher(ballot_crypto::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SubmitError {
  /// The terminal state this failure represents, if it is one of the
  /// pipeline's defined exits rather than a validation or infrastructure
  /// error.
  pub fn terminal_state(&self) -> Option<Terminal> {
    match self {
      SubmitError::Token(_) => Some(Terminal::TokenInvalid),
      SubmitError::RateLimited(_) => Some(Terminal::RateLimited),
      SubmitError::AlreadyVoted => Some(Terminal::AlreadyVoted),
      SubmitError::EngineUnavailable(_) | SubmitError::EngineRejected(_) => {
        Some(Terminal::EngineRejected)
      }
      SubmitError::EmptyBallot
      | SubmitError::UnknownVoter(_)
      | SubmitError::Cipher(_)
      | SubmitError::Store(_) => None,
    }
  }
}

fn store_err(e: impl std::error::Error + Send + Sync + 'static) -> SubmitError {
  SubmitError::Store(Box::new(e))
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Owns the collaborators a vote passes through.
///
/// Cheap to clone; clones share the per-voter locks.
pub struct SubmissionPipeline<S, E> {
  store:       Arc<S>,
  tokens:      Arc<TokenAuthority>,
  cipher:      Arc<VoteCipher>,
  admission:   Arc<dyn AdmissionControl>,
  engine:      Arc<E>,
  voter_locks: Arc<DashMap<VoterId, Arc<Mutex<()>>>>,
}

impl<S, E> Clone for SubmissionPipeline<S, E> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      tokens:      Arc::clone(&self.tokens),
      cipher:      Arc::clone(&self.cipher),
      admission:   Arc::clone(&self.admission),
      engine:      Arc::clone(&self.engine),
      voter_locks: Arc::clone(&self.voter_locks),
    }
  }
}

impl<S, E> SubmissionPipeline<S, E>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  pub fn new(
    store: Arc<S>,
    tokens: Arc<TokenAuthority>,
    cipher: Arc<VoteCipher>,
    admission: Arc<dyn AdmissionControl>,
    engine: Arc<E>,
  ) -> Self {
    Self { store, tokens, cipher, admission, engine, voter_locks: Arc::default() }
  }

  /// Run one ballot through every stage.
  pub async fn submit(&self, ballot: Ballot) -> Result<Recorded, SubmitError> {
    let Ballot { token, content, origin } = ballot;
    tracing::debug!(stage = %Stage::Received, %origin);

    let claims = self.tokens.verify(&token).map_err(SubmitError::Token)?;
    let voter_id = claims.voter_id;
    tracing::debug!(stage = %Stage::TokenVerified, voter_id);

    self.admission.check_and_increment(Route::Vote, &voter_id.to_string())?;
    tracing::debug!(stage = %Stage::Admitted, voter_id);

    let content = content.trim();
    if content.is_empty() {
      return Err(SubmitError::EmptyBallot);
    }

    // Held until the outcome is recorded so a voter cannot relay twice.
    let lock = self.voter_lock(voter_id);
    let outcome = {
      let _guard = lock.lock().await;
      self.relay_unvoted(voter_id, content, &origin).await
    };
    self.release_voter_lock(voter_id, lock);
    outcome
  }

  /// Stages from the `has_voted` check to the recorded outcome. Callers hold
  /// the voter's lock.
  async fn relay_unvoted(
    &self,
    voter_id: VoterId,
    content: &str,
    origin: &str,
  ) -> Result<Recorded, SubmitError> {
    let identity = self
      .store
      .find_by_id(voter_id)
      .await
      .map_err(store_err)?
      .ok_or(SubmitError::UnknownVoter(voter_id))?;
    if identity.has_voted {
      return self.duplicate(voter_id, origin).await;
    }
    tracing::debug!(stage = %Stage::UnvotedChecked, voter_id);

    let envelope = self.cipher.encrypt(content).map_err(SubmitError::Cipher)?;
    let command = EngineCommand::vote(voter_id, envelope.as_str())
      .map_err(|_| SubmitError::Cipher(ballot_crypto::Error::Encrypt))?;
    tracing::debug!(stage = %Stage::Encrypted, voter_id);

    let raw = self.engine.send(command).await;
    tracing::debug!(stage = %Stage::Relayed, voter_id);

    match VoteReply::interpret(&raw) {
      VoteReply::Accepted(_) => {
        if !self.store.mark_voted(voter_id).await.map_err(store_err)? {
          return self.duplicate(voter_id, origin).await;
        }
        let receipt = receipt(&envelope);
        self
          .audit(
            NewAuditEntry::new(Some(voter_id), AuditAction::VoteCast)
              .detail(format!("Vote cast successfully; receipt {receipt}"))
              .origin(origin),
          )
          .await?;
        tracing::info!(stage = %Stage::Recorded, voter_id, %origin, "vote recorded");
        Ok(Recorded { voter_id, receipt })
      }
      VoteReply::Rejected(raw) => {
        self
          .audit(
            NewAuditEntry::new(Some(voter_id), AuditAction::VoteFailed)
              .detail(format!("Vote failed: {raw}"))
              .origin(origin),
          )
          .await?;
        tracing::warn!(voter_id, reply = %raw, "engine did not accept vote");
        if is_unavailable(&raw) {
          Err(SubmitError::EngineUnavailable(raw))
        } else {
          Err(SubmitError::EngineRejected(raw))
        }
      }
    }
  }

  fn voter_lock(&self, voter_id: VoterId) -> Arc<Mutex<()>> {
    Arc::clone(&self.voter_locks.entry(voter_id).or_default())
  }

  /// Drop the map's entry once nobody but `lock` (and the map) refers to it.
  /// Clones are taken under the same shard lock, so a queued waiter keeps the
  /// entry alive.
  fn release_voter_lock(&self, voter_id: VoterId, lock: Arc<Mutex<()>>) {
    self.voter_locks.remove_if(&voter_id, |_, held| {
      Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2
    });
  }

  async fn duplicate(&self, voter_id: VoterId, origin: &str) -> Result<Recorded, SubmitError> {
    self
      .audit(
        NewAuditEntry::new(Some(voter_id), AuditAction::VoteDuplicate)
          .detail("Attempted to vote twice")
          .origin(origin),
      )
      .await?;
    tracing::info!(voter_id, %origin, "duplicate vote refused");
    Err(SubmitError::AlreadyVoted)
  }

  async fn audit(&self, entry: NewAuditEntry) -> Result<(), SubmitError> {
    self.store.append_audit(entry).await.map_err(store_err)?;
    Ok(())
  }
}
