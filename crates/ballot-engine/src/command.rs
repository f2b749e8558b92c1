//! Commands understood by the tally engine.

use std::fmt;

use ballot_core::identity::VoterId;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("engine payloads must be non-empty and contain no whitespace")]
pub struct InvalidCommand;

/// One request line. `Display` yields the wire form without the newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
  /// `VOTE <voter_id> <payload>`; the engine replies with free text.
  Vote { voter_id: VoterId, payload: String },
  /// `STATUS`; the engine replies with one JSON document.
  Status,
  /// `TALLY`; the engine replies with one JSON document.
  Tally,
}

impl EngineCommand {
  /// Build a `VOTE` command. `payload` is a single token on the wire, so it
  /// must not contain whitespace (base64 envelopes never do).
  pub fn vote(voter_id: VoterId, payload: impl Into<String>) -> Result<Self, InvalidCommand> {
    let payload = payload.into();
    if payload.is_empty() || payload.chars().any(char::is_whitespace) {
      return Err(InvalidCommand);
    }
    Ok(Self::Vote { voter_id, payload })
  }
}

impl fmt::Display for EngineCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Vote { voter_id, payload } => write!(f, "VOTE {voter_id} {payload}"),
      Self::Status => f.write_str("STATUS"),
      Self::Tally => f.write_str("TALLY"),
    }
  }
}
