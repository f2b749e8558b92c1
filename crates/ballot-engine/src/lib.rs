//! Channel to the external tally engine.
//!
//! The engine is an opaque, stateful worker process speaking a line protocol
//! on its standard streams: exactly one command line in, exactly one reply
//! line out, no pipelining. [`ProcessEngine`] owns that process and presents
//! it as a request/response function; anything implementing
//! [`EngineChannel`] can stand in for it.

#![allow(async_fn_in_trait)]

pub mod command;
pub mod process;
pub mod reply;

use std::future::Future;

pub use command::{EngineCommand, InvalidCommand};
pub use process::{EngineConfig, ProcessEngine};
pub use reply::VoteReply;

// ─── Channel-generated replies ───────────────────────────────────────────────

/// Returned by every send while the engine executable could not be launched.
pub const BACKEND_UNAVAILABLE: &str = "ERROR: backend not available";
/// Returned when the worker has exited or its pipes broke mid-exchange.
pub const PROCESS_ENDED: &str = "ERROR: process ended";
/// Returned when no reply line arrived within the read timeout.
pub const TIMED_OUT: &str = "ERROR: engine timed out";
/// Returned when the reply exceeded the maximum line length.
pub const REPLY_TOO_LONG: &str = "ERROR: engine reply too long";
/// Returned after [`ProcessEngine::shutdown`] until an explicit restart.
pub const ENGINE_STOPPED: &str = "ERROR: engine stopped";
/// Returned when a command would break line framing.
pub const INVALID_COMMAND: &str = "ERROR: invalid command";

/// Whether `reply` was produced by the channel itself because the engine could
/// not be reached, rather than by the engine.
pub fn is_unavailable(reply: &str) -> bool {
  matches!(
    reply,
    BACKEND_UNAVAILABLE
      | PROCESS_ENDED
      | ENGINE_STOPPED
      | TIMED_OUT
      | REPLY_TOO_LONG
      | INVALID_COMMAND
  )
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A serialized request/response channel to a tally engine.
///
/// Implementations must never interleave two exchanges and must never fail:
/// every problem is reported as an `ERROR: …` reply line.
pub trait EngineChannel: Send + Sync {
  fn send(&self, command: EngineCommand) -> impl Future<Output = String> + Send + '_;
}
