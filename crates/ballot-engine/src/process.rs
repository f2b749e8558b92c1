//! [`ProcessEngine`]: the tally engine as a long-lived child process.

use std::{
  io,
  path::PathBuf,
  process::{ExitStatus, Stdio},
  time::Duration,
};

use tokio::{
  io::{AsyncBufReadExt as _, AsyncReadExt as _, AsyncWriteExt as _, BufReader},
  process::{Child, ChildStdin, ChildStdout, Command},
  sync::Mutex,
};

use crate::{
  BACKEND_UNAVAILABLE, ENGINE_STOPPED, EngineChannel, EngineCommand, INVALID_COMMAND,
  PROCESS_ENDED, REPLY_TOO_LONG, TIMED_OUT,
};

/// Longest reply line accepted from the engine, newline included.
pub const MAX_REPLY_LEN: usize = 1024 * 1024;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EngineConfig {
  pub program:         PathBuf,
  pub args:            Vec<String>,
  /// How long to wait for a reply line before killing the worker.
  pub read_timeout:    Duration,
  /// Relaunch the worker once when a send finds it has exited.
  pub restart_on_exit: bool,
}

impl EngineConfig {
  /// `program --interactive`, 30 s read timeout, no automatic restart.
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program:         program.into(),
      args:            vec!["--interactive".to_owned()],
      read_timeout:    Duration::from_secs(30),
      restart_on_exit: false,
    }
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

struct Session {
  child:  Child,
  stdin:  ChildStdin,
  stdout: BufReader<ChildStdout>,
}

enum ExchangeFailure {
  Io(io::Error),
  Eof,
  TimedOut,
  TooLong,
}

impl ExchangeFailure {
  fn reply(&self) -> &'static str {
    match self {
      Self::Io(_) | Self::Eof => PROCESS_ENDED,
      Self::TimedOut => TIMED_OUT,
      Self::TooLong => REPLY_TOO_LONG,
    }
  }
}

impl Session {
  fn spawn(config: &EngineConfig) -> io::Result<Self> {
    let mut child = Command::new(&config.program)
      .args(&config.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      // Nobody drains stderr; a piped but unread stderr could block the worker.
      .stderr(Stdio::null())
      .kill_on_drop(true)
      .spawn()?;

    let stdin = child
      .stdin
      .take()
      .ok_or_else(|| io::Error::other("failed to capture engine stdin"))?;
    let stdout = child
      .stdout
      .take()
      .ok_or_else(|| io::Error::other("failed to capture engine stdout"))?;

    Ok(Self { child, stdin, stdout: BufReader::new(stdout) })
  }

  /// Write one command line and read exactly one reply line.
  async fn exchange(
    &mut self,
    line: &str,
    read_timeout: Duration,
  ) -> Result<String, ExchangeFailure> {
    let mut framed = String::with_capacity(line.len() + 1);
    framed.push_str(line);
    framed.push('\n');

    self.stdin.write_all(framed.as_bytes()).await.map_err(ExchangeFailure::Io)?;
    self.stdin.flush().await.map_err(ExchangeFailure::Io)?;

    let mut buf = String::new();
    let mut limited = (&mut self.stdout).take(MAX_REPLY_LEN as u64);
    let result = tokio::time::timeout(read_timeout, limited.read_line(&mut buf)).await;

    match result {
      Err(_) => Err(ExchangeFailure::TimedOut),
      Ok(Err(e)) => Err(ExchangeFailure::Io(e)),
      Ok(Ok(0)) => Err(ExchangeFailure::Eof),
      Ok(Ok(n)) if n >= MAX_REPLY_LEN && !buf.ends_with('\n') => Err(ExchangeFailure::TooLong),
      Ok(Ok(_)) => {
        let trimmed = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(trimmed);
        Ok(buf)
      }
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

enum EngineState {
  /// The executable could not be launched; every send short-circuits.
  Degraded,
  Running(Session),
  Exited,
  /// Shut down on purpose; only an explicit [`ProcessEngine::restart`] leaves it.
  Stopped,
}

/// Owns the engine process and serializes all exchanges with it.
///
/// The mutex is held across the whole write/read pair, so concurrent callers
/// queue up and never see each other's replies.
pub struct ProcessEngine {
  config: EngineConfig,
  state:  Mutex<EngineState>,
}

impl ProcessEngine {
  /// Launch the engine. A launch failure leaves the channel degraded instead
  /// of failing, so the rest of the service stays usable.
  pub fn start(config: EngineConfig) -> Self {
    let state = match Session::spawn(&config) {
      Ok(session) => {
        tracing::info!(
          program = %config.program.display(),
          pid = session.child.id(),
          "tally engine started"
        );
        EngineState::Running(session)
      }
      Err(e) => {
        tracing::warn!(
          program = %config.program.display(),
          error = %e,
          "tally engine not available; running degraded"
        );
        EngineState::Degraded
      }
    };
    Self { config, state: Mutex::new(state) }
  }

  /// Whether the worker process is currently running.
  pub async fn is_alive(&self) -> bool {
    let mut state = self.state.lock().await;
    poll_liveness(&mut state);
    matches!(*state, EngineState::Running(_))
  }

  /// Kill any current worker and launch a fresh one.
  pub async fn restart(&self) -> io::Result<()> {
    let mut state = self.state.lock().await;
    if let EngineState::Running(session) = &mut *state {
      let _ = session.child.kill().await;
    }
    match Session::spawn(&self.config) {
      Ok(session) => {
        tracing::info!(pid = session.child.id(), "tally engine restarted");
        *state = EngineState::Running(session);
        Ok(())
      }
      Err(e) => {
        tracing::error!(error = %e, "tally engine restart failed");
        *state = EngineState::Degraded;
        Err(e)
      }
    }
  }

  /// Kill the worker and wait for it to exit. Later sends are refused
  /// without relaunching, whatever `restart_on_exit` says.
  pub async fn shutdown(&self) {
    let mut state = self.state.lock().await;
    if let EngineState::Running(session) = &mut *state {
      let _ = session.child.kill().await;
    }
    *state = EngineState::Stopped;
  }

  /// Send one raw command line and return the reply line.
  pub async fn send_line(&self, line: &str) -> String {
    if line.contains(['\n', '\r']) {
      return INVALID_COMMAND.to_owned();
    }

    let mut state = self.state.lock().await;
    poll_liveness(&mut state);

    if self.config.restart_on_exit && matches!(*state, EngineState::Exited) {
      match Session::spawn(&self.config) {
        Ok(session) => {
          tracing::info!(pid = session.child.id(), "tally engine relaunched after exit");
          *state = EngineState::Running(session);
        }
        Err(e) => tracing::error!(error = %e, "tally engine relaunch failed"),
      }
    }

    let outcome = match &mut *state {
      EngineState::Degraded => return BACKEND_UNAVAILABLE.to_owned(),
      EngineState::Exited => return PROCESS_ENDED.to_owned(),
      EngineState::Stopped => return ENGINE_STOPPED.to_owned(),
      EngineState::Running(session) => session.exchange(line, self.config.read_timeout).await,
    };

    match outcome {
      Ok(reply) => reply,
      Err(failure) => {
        match &failure {
          ExchangeFailure::Io(e) => tracing::warn!(error = %e, "tally engine pipe failed"),
          ExchangeFailure::Eof => tracing::warn!("tally engine closed its output"),
          ExchangeFailure::TimedOut => tracing::warn!(
            timeout_ms = self.config.read_timeout.as_millis() as u64,
            "tally engine did not reply in time; killing it"
          ),
          ExchangeFailure::TooLong => tracing::warn!("tally engine reply exceeded limit; killing it"),
        }
        // The protocol position is unknown now; the worker cannot be reused.
        if let EngineState::Running(mut session) =
          std::mem::replace(&mut *state, EngineState::Exited)
        {
          let _ = session.child.start_kill();
        }
        failure.reply().to_owned()
      }
    }
  }
}

impl EngineChannel for ProcessEngine {
  async fn send(&self, command: EngineCommand) -> String {
    self.send_line(&command.to_string()).await
  }
}

/// Move `Running` to `Exited` if the worker has terminated.
fn poll_liveness(state: &mut EngineState) {
  let EngineState::Running(session) = state else { return };
  let status: Option<ExitStatus> = match session.child.try_wait() {
    Ok(status) => status,
    Err(e) => {
      tracing::warn!(error = %e, "could not poll tally engine");
      return;
    }
  };
  if let Some(status) = status {
    tracing::warn!(%status, "tally engine exited");
    *state = EngineState::Exited;
  }
}
