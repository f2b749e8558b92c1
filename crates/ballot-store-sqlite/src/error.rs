//! Error type for `ballot-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ballot_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("voter {0} has voted but no voted_at timestamp")]
  MissingVotedAt(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
