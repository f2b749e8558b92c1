//! Interpretation of `VOTE` replies.
//!
//! Replies are free text. A reply whose first word is `OK` or `SUCCESS` is an
//! acceptance and one whose first word is `ERROR` is a rejection, regardless
//! of what follows. Any other reply is judged by the legacy rule: it is a
//! rejection iff it contains `ERROR` anywhere.

const ERROR_MARKER: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteReply {
  Accepted(String),
  Rejected(String),
}

impl VoteReply {
  pub fn interpret(raw: &str) -> Self {
    let first_word = raw
      .trim_start()
      .split(|c: char| c.is_whitespace() || c == ':')
      .next()
      .unwrap_or_default();

    let accepted = match first_word {
      "OK" | "SUCCESS" => true,
      ERROR_MARKER => false,
      _ => !raw.contains(ERROR_MARKER),
    };

    if accepted {
      Self::Accepted(raw.to_owned())
    } else {
      Self::Rejected(raw.to_owned())
    }
  }

  pub fn is_accepted(&self) -> bool { matches!(self, Self::Accepted(_)) }

  pub fn raw(&self) -> &str {
    match self {
      Self::Accepted(r) | Self::Rejected(r) => r,
    }
  }
}
