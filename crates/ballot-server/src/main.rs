//! ballot relay server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) under `BALLOT_*`
//! environment variables, opens the SQLite credential store, launches the
//! tally engine and serves the JSON API, over HTTPS when a certificate and key
//! are configured and loadable.
//!
//! # Admin accounts
//!
//! Registration only ever creates regular voters. To create an administrator:
//!
//! ```
//! cargo run -p ballot-server --bin server -- create-admin --email root@example.com
//! ```

use std::{
  net::SocketAddr,
  path::{Path, PathBuf},
  sync::Arc,
  time::{Duration, Instant},
};

use anyhow::Context as _;
use axum_server::tls_rustls::RustlsConfig;
use ballot_core::{
  identity::{NewIdentity, normalize_email, validate_credentials},
  store::{CreateOutcome, CredentialStore},
};
use ballot_crypto::{TokenAuthority, VoteCipher};
use ballot_engine::ProcessEngine;
use ballot_server::{
  AppState, ServerConfig,
  admission::MemoryAdmission,
  auth::hash_password,
  cors_layer,
};
use ballot_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// How often idle admission counters are swept.
const EVICTION_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Parser)]
#[command(author, version, about = "Ballot relay server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API (the default).
  Serve,
  /// Create an administrator; the password is read from stdin.
  CreateAdmin {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name:  Option<String>,
  },
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cfg).await,
    Command::CreateAdmin { email, name } => create_admin(&cfg, &email, name).await,
    Command::HashPassword => {
      let password = rpassword_or_stdin()?;
      println!("{}", hash_password(&password)?);
      Ok(())
    }
  }
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  for secret in cfg.dev_secrets() {
    tracing::warn!(secret, "using development default; set BALLOT_{} in production", secret.to_uppercase());
  }

  let store = open_store(&cfg).await?;

  let engine = Arc::new(ProcessEngine::start(cfg.engine_config()));

  let admission = Arc::new(MemoryAdmission::new(cfg.quotas()));
  tokio::spawn({
    let admission = Arc::clone(&admission);
    async move {
      let mut tick = tokio::time::interval(EVICTION_INTERVAL);
      loop {
        tick.tick().await;
        admission.evict_expired(Instant::now());
      }
    }
  });

  // Build application state.
  let state = AppState::new(
    Arc::new(store),
    Arc::new(TokenAuthority::new(cfg.jwt_secret.as_bytes())),
    Arc::new(VoteCipher::from_secret(&cfg.encryption_key)),
    admission,
    Arc::clone(&engine),
  );

  let app = ballot_server::router(state)
    .layer(cors_layer(&cfg.origins()))
    .into_make_service_with_connect_info::<SocketAddr>();

  let address: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
    .parse()
    .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;

  let tls = match cfg.tls_paths() {
    Some((cert, key)) => match RustlsConfig::from_pem_file(&cert, &key).await {
      Ok(tls) => Some(tls),
      Err(e) => {
        tracing::warn!(error = %e, cert = %cert.display(), "failed to load TLS certificate; falling back to HTTP");
        None
      }
    },
    None => None,
  };

  let result = match tls {
    Some(tls) => {
      tracing::info!("Listening on https://{address}");
      axum_server::bind_rustls(address, tls)
        .serve(app)
        .await
        .context("server error")
    }
    None => {
      tracing::warn!("TLS not configured; serving plain HTTP");
      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
      axum::serve(listener, app).await.context("server error")
    }
  };

  engine.shutdown().await;
  result
}

async fn create_admin(cfg: &ServerConfig, email: &str, name: Option<String>) -> anyhow::Result<()> {
  let email    = normalize_email(email);
  let password = rpassword_or_stdin()?;
  validate_credentials(&email, &password)?;

  let hash  = hash_password(&password)?;
  let store = open_store(cfg).await?;

  match store.create_identity(NewIdentity::voter(&email, hash, name).admin()).await? {
    CreateOutcome::Created(admin) => {
      tracing::info!(voter_id = admin.voter_id, "admin created");
      println!("created admin {} (voter_id {})", admin.email, admin.voter_id);
      Ok(())
    }
    CreateOutcome::EmailTaken => anyhow::bail!("{email} is already registered"),
  }
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  // Expand `~` in store path.
  let store_path = expand_tilde(&cfg.store_path);
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

/// Read a password from stdin (no echo).
fn rpassword_or_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
