//! HTTP surface of the ballot relay.
//!
//! Exposes an axum [`Router`] over any [`CredentialStore`] and
//! [`EngineChannel`]: registration and login, the vote submission pipeline,
//! the voter's profile, admin passthrough to the tally engine, and health.

pub mod admission;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod origin;
pub mod pipeline;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  http::{HeaderValue, Method, header},
  routing::{get, post},
};
use ballot_core::store::CredentialStore;
use ballot_crypto::{TokenAuthority, VoteCipher};
use ballot_engine::{EngineChannel, EngineConfig};
use serde::Deserialize;
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

use admission::{AdmissionControl, Quota, Quotas};
use handlers::{accounts, admin, health, profile, vote};
use pipeline::SubmissionPipeline;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Used when no token secret is configured. Never acceptable in production.
pub const DEV_JWT_SECRET: &str = "dev-jwt-secret-change-in-production";
/// Used when no vote-encryption secret is configured.
pub const DEV_ENCRYPTION_KEY: &str = "dev-encryption-key-change-in-production";

/// Runtime server configuration: `config.toml` layered under `BALLOT_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  pub jwt_secret:             String,
  pub encryption_key:         String,
  /// Comma-separated list of CORS origins.
  pub allowed_origins:        String,
  pub tls_cert_path:          Option<PathBuf>,
  pub tls_key_path:           Option<PathBuf>,
  pub engine_path:            PathBuf,
  /// Whitespace-separated arguments for the engine executable.
  pub engine_args:            String,
  pub engine_timeout_secs:    u64,
  pub engine_restart_on_exit: bool,
  pub register_per_hour:      u32,
  pub login_per_hour:         u32,
  pub votes_per_day:          u32,
}

impl ServerConfig {
  /// Read `path` (if it exists) and the environment over built-in defaults.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "0.0.0.0")?
      .set_default("port", 5000_i64)?
      .set_default("store_path", "voters.db")?
      .set_default("jwt_secret", DEV_JWT_SECRET)?
      .set_default("encryption_key", DEV_ENCRYPTION_KEY)?
      .set_default("allowed_origins", "http://localhost:5000,http://localhost:5001")?
      .set_default("engine_path", "bin/SecureVoteSystem")?
      .set_default("engine_args", "--interactive")?
      .set_default("engine_timeout_secs", 30_i64)?
      .set_default("engine_restart_on_exit", false)?
      .set_default("register_per_hour", 5_i64)?
      .set_default("login_per_hour", 10_i64)?
      .set_default("votes_per_day", 5_i64)?
      .add_source(config::File::from(path.into()).required(false))
      .add_source(config::Environment::with_prefix("BALLOT"))
      .build()?
      .try_deserialize()
  }

  pub fn origins(&self) -> Vec<String> {
    self
      .allowed_origins
      .split(',')
      .map(str::trim)
      .filter(|o| !o.is_empty())
      .map(str::to_owned)
      .collect()
  }

  pub fn quotas(&self) -> Quotas {
    Quotas {
      register: Quota::per_hour(self.register_per_hour),
      login:    Quota::per_hour(self.login_per_hour),
      vote:     Quota::per_day(self.votes_per_day),
    }
  }

  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      args: self.engine_args.split_whitespace().map(str::to_owned).collect(),
      read_timeout: Duration::from_secs(self.engine_timeout_secs),
      restart_on_exit: self.engine_restart_on_exit,
      ..EngineConfig::new(&self.engine_path)
    }
  }

  /// Certificate and key paths, when both are configured.
  pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
    Some((self.tls_cert_path.clone()?, self.tls_key_path.clone()?))
  }

  /// Which secrets still hold their development defaults.
  pub fn dev_secrets(&self) -> Vec<&'static str> {
    let mut found = Vec::new();
    if self.jwt_secret == DEV_JWT_SECRET {
      found.push("jwt_secret");
    }
    if self.encryption_key == DEV_ENCRYPTION_KEY {
      found.push("encryption_key");
    }
    found
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, E> {
  pub store:     Arc<S>,
  pub tokens:    Arc<TokenAuthority>,
  pub admission: Arc<dyn AdmissionControl>,
  pub engine:    Arc<E>,
  pub pipeline:  SubmissionPipeline<S, E>,
}

impl<S, E> Clone for AppState<S, E> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      tokens:    Arc::clone(&self.tokens),
      admission: Arc::clone(&self.admission),
      engine:    Arc::clone(&self.engine),
      pipeline:  self.pipeline.clone(),
    }
  }
}

impl<S, E> AppState<S, E>
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
    let pipeline = SubmissionPipeline::new(
      Arc::clone(&store),
      Arc::clone(&tokens),
      cipher,
      Arc::clone(&admission),
      Arc::clone(&engine),
    );
    Self { store, tokens, admission, engine, pipeline }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the relay.
pub fn router<S, E>(state: AppState<S, E>) -> Router
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  Router::new()
    .route("/health",      get(health::handler::<S, E>))
    .route("/register",    post(accounts::register::<S, E>))
    .route("/login",       post(accounts::login::<S, E>))
    .route("/vote",        post(vote::handler::<S, E>))
    .route("/profile",     get(profile::handler::<S, E>))
    .route("/status",      get(admin::status::<S, E>))
    .route("/tally",       get(admin::tally::<S, E>))
    .route("/admin/stats", get(admin::stats::<S, E>))
    .route("/admin/audit", get(admin::audit::<S, E>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// CORS for the configured browser origins. Origins that do not parse as
/// header values are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
  let origins: Vec<HeaderValue> = origins
    .iter()
    .filter_map(|o| match HeaderValue::from_str(o) {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring unparseable CORS origin");
        None
      }
    })
    .collect();

  CorsLayer::new()
    .allow_origin(AllowOrigin::list(origins))
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    .allow_credentials(true)
}

#[cfg(test)]
mod tests {
  use std::{net::SocketAddr, sync::Mutex};

  use axum::{
    body::{Body, to_bytes},
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use ballot_core::{
    audit::AuditAction,
    identity::NewIdentity,
    store::{AuditQuery, CreateOutcome},
  };
  use ballot_engine::{EngineCommand, ProcessEngine};
  use ballot_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;
  use crate::admission::MemoryAdmission;

  /// Records every command line and answers `OK` to votes and a fixed JSON
  /// object to everything else.
  #[derive(Default)]
  struct FakeEngine {
    seen: Mutex<Vec<String>>,
  }

  impl FakeEngine {
    fn seen(&self) -> Vec<String> { self.seen.lock().unwrap().clone() }
  }

  impl EngineChannel for FakeEngine {
    async fn send(&self, command: EngineCommand) -> String {
      self.seen.lock().unwrap().push(command.to_string());
      match command {
        EngineCommand::Vote { .. } => "OK".into(),
        EngineCommand::Status => r#"{"status":"running","votes":1}"#.into(),
        EngineCommand::Tally => r#"{"Candidate X":1}"#.into(),
      }
    }
  }

  struct TestApp<E> {
    state: AppState<SqliteStore, E>,
    app:   Router,
  }

  async fn make_app_with<E: EngineChannel + 'static>(engine: Arc<E>) -> TestApp<E> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = AppState::new(
      Arc::new(store),
      Arc::new(TokenAuthority::new(b"router-test-secret")),
      Arc::new(VoteCipher::from_key([3; 32])),
      Arc::new(MemoryAdmission::default()),
      engine,
    );
    TestApp { app: router(state.clone()), state }
  }

  async fn make_app() -> (TestApp<FakeEngine>, Arc<FakeEngine>) {
    let engine = Arc::new(FakeEngine::default());
    (make_app_with(Arc::clone(&engine)).await, engine)
  }

  async fn call(
    app:    &Router,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp   = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes  = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
  }

  async fn register(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    call(
      app,
      "POST",
      "/register",
      None,
      Some(json!({ "email": email, "password": password, "full_name": "Test Voter" })),
    )
    .await
  }

  impl<E: EngineChannel + 'static> TestApp<E> {
    async fn admin_token(&self) -> String {
      let CreateOutcome::Created(admin) = self
        .state
        .store
        .create_identity(NewIdentity::voter("root@example.com", "$argon2id$unused", None).admin())
        .await
        .unwrap()
      else {
        panic!("admin email taken");
      };
      self.state.tokens.issue(admin.voter_id, &admin.email, true).unwrap()
    }
  }

  // ── End-to-end scenario ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_login_vote_once() {
    let (t, engine) = make_app().await;

    let (status, body) = register(&t.app, "alice@example.com", "correct-horse").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Registration successful");
    let voter_id = body["voter_id"].as_i64().unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, body) = call(
      &t.app,
      "POST",
      "/login",
      None,
      Some(json!({ "email": "alice@example.com", "password": "battery-staple" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
    let failed = t
      .state
      .store
      .list_audit(&AuditQuery { voter_id: Some(voter_id), limit: None })
      .await
      .unwrap();
    assert_eq!(failed.last().unwrap().action, AuditAction::LoginFailed);

    let (status, body) = call(
      &t.app,
      "POST",
      "/login",
      None,
      Some(json!({ "email": "Alice@Example.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_voted"], false);
    let token = body["token"].as_str().unwrap().to_owned();

    let (status, body) =
      call(&t.app, "POST", "/vote", Some(&token), Some(json!({ "content": "Candidate X" }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["encrypted"], true);
    assert_eq!(body["receipt"].as_str().unwrap().len(), 64);

    let seen = engine.seen();
    assert_eq!(seen.len(), 1);
    let payload = seen[0].strip_prefix(&format!("VOTE {voter_id} ")).unwrap();
    assert!(B64.decode(payload).is_ok());

    let (status, body) =
      call(&t.app, "POST", "/vote", Some(&token), Some(json!({ "content": "Candidate Y" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You have already voted");
    assert_eq!(engine.seen().len(), 1);

    let (_, body) = call(&t.app, "GET", "/health", None, None).await;
    assert_eq!(body, json!({ "status": "healthy", "registered_voters": 1, "votes_cast": 1 }));
  }

  // ── Registration and login ──────────────────────────────────────────────────

  #[tokio::test]
  async fn registration_validation_and_conflict() {
    let (t, _) = make_app().await;

    let (status, _) = register(&t.app, "not-an-email", "long-enough").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = register(&t.app, "bob@example.com", "short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");

    let (status, _) = register(&t.app, "bob@example.com", "long-enough").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&t.app, " BOB@example.com ", "long-enough").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
  }

  #[tokio::test]
  async fn malformed_json_is_a_bad_request() {
    let (t, _) = make_app().await;
    let req = Request::builder()
      .method("POST")
      .uri("/register")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{not json"))
      .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unknown_email_login_is_audited_anonymously() {
    let (t, _) = make_app().await;
    let (status, body) = call(
      &t.app,
      "POST",
      "/login",
      None,
      Some(json!({ "email": "nobody@example.com", "password": "whatever1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let entries = t.state.store.list_audit(&AuditQuery::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::LoginFailed);
    assert_eq!(entries[0].voter_id, None);
  }

  #[tokio::test]
  async fn registration_is_rate_limited_per_origin() {
    let (t, _) = make_app().await;

    // Invalid attempts still count towards the quota.
    for _ in 0..5 {
      let (status, _) = register(&t.app, "x@example.com", "short").await;
      assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, body) = register(&t.app, "x@example.com", "long-enough").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "rate_limited");
    assert!(body["retry_after"].as_u64().unwrap() > 0);
    assert_eq!(t.state.store.count_identities().await.unwrap(), 0);

    let elsewhere = t
      .app
      .clone()
      .layer(MockConnectInfo(SocketAddr::from(([203, 0, 113, 9], 50000))));
    let (status, _) = register(&elsewhere, "x@example.com", "long-enough").await;
    assert_eq!(status, StatusCode::CREATED);
  }

  // ── Authenticated routes ────────────────────────────────────────────────────

  #[tokio::test]
  async fn profile_requires_token_and_hides_hash() {
    let (t, _) = make_app().await;
    let (_, body) = register(&t.app, "carol@example.com", "long-enough").await;
    let token = body["token"].as_str().unwrap().to_owned();

    let (status, body) = call(&t.app, "GET", "/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No authorization header");

    let (status, body) = call(&t.app, "GET", "/profile", Some("junk"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_invalid");

    let (status, body) = call(&t.app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "carol@example.com");
    assert_eq!(body["full_name"], "Test Voter");
    assert_eq!(body["has_voted"], false);
    assert!(body.get("password_hash").is_none());
  }

  #[tokio::test]
  async fn vote_without_content_is_rejected() {
    let (t, engine) = make_app().await;
    let (_, body) = register(&t.app, "dan@example.com", "long-enough").await;
    let token = body["token"].as_str().unwrap().to_owned();

    let (status, body) =
      call(&t.app, "POST", "/vote", Some(&token), Some(json!({ "content": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Vote content required");
    assert!(engine.seen().is_empty());

    let (status, _) = call(&t.app, "POST", "/vote", None, Some(json!({ "content": "A" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn admin_routes_require_admin() {
    let (t, _) = make_app().await;
    let (_, body) = register(&t.app, "eve@example.com", "long-enough").await;
    let voter = body["token"].as_str().unwrap().to_owned();

    for uri in ["/status", "/tally", "/admin/stats", "/admin/audit"] {
      let (status, body) = call(&t.app, "GET", uri, Some(&voter), None).await;
      assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
      assert_eq!(body["error"], "Admin access required");
    }
  }

  #[tokio::test]
  async fn admin_sees_engine_and_stats() {
    let (t, _) = make_app().await;
    let admin = t.admin_token().await;
    let (_, body) = register(&t.app, "fay@example.com", "long-enough").await;
    let voter = body["token"].as_str().unwrap().to_owned();
    call(&t.app, "POST", "/vote", Some(&voter), Some(json!({ "content": "Candidate X" }))).await;

    let (status, body) = call(&t.app, "GET", "/tally", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "Candidate X": 1 }));

    let (status, body) = call(&t.app, "GET", "/status", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");

    let (_, body) = call(&t.app, "GET", "/admin/stats", Some(&admin), None).await;
    assert_eq!(body["total_registered"], 2);
    assert_eq!(body["total_voted"], 1);
    assert_eq!(body["turnout_percentage"], 50.0);

    let (status, body) = call(&t.app, "GET", "/admin/audit?limit=1", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "VOTE_CAST");
  }

  // ── Degraded engine ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_engine_degrades_only_engine_routes() {
    let engine = ProcessEngine::start(EngineConfig::new("/nonexistent/tally-engine"));
    let t      = make_app_with(Arc::new(engine)).await;
    let admin  = t.admin_token().await;

    let (status, _) = call(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = register(&t.app, "gus@example.com", "long-enough").await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["token"].as_str().unwrap().to_owned();

    let (status, _) = call(
      &t.app,
      "POST",
      "/login",
      None,
      Some(json!({ "email": "gus@example.com", "password": "long-enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&t.app, "GET", "/status", Some(&admin), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "engine_unavailable");

    let (status, body) =
      call(&t.app, "POST", "/vote", Some(&token), Some(json!({ "content": "A" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "engine_unavailable");

    let (_, body) = call(&t.app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(body["has_voted"], false);
  }

  /// An engine that is up but rejects every command.
  struct RefusingEngine;

  impl EngineChannel for RefusingEngine {
    async fn send(&self, _command: EngineCommand) -> String { "ERROR: unknown command".into() }
  }

  #[tokio::test]
  async fn engine_error_reply_is_not_reported_as_unavailable() {
    let t     = make_app_with(Arc::new(RefusingEngine)).await;
    let admin = t.admin_token().await;

    for uri in ["/status", "/tally"] {
      let (status, body) = call(&t.app, "GET", uri, Some(&admin), None).await;
      assert_eq!(status, StatusCode::BAD_GATEWAY, "{uri}");
      assert_eq!(body["code"], "engine_error", "{uri}");
      assert_eq!(body["error"], "tally engine error: ERROR: unknown command", "{uri}");
    }
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  #[test]
  fn environment_values_are_not_coerced() {
    // SAFETY: no other test sets these variables or depends on their values.
    unsafe {
      std::env::set_var("BALLOT_ENCRYPTION_KEY", "007");
      std::env::set_var("BALLOT_JWT_SECRET", "0123456789");
      std::env::set_var("BALLOT_VOTES_PER_DAY", "3");
    }
    let cfg = ServerConfig::load("/nonexistent/ballot-config.toml");
    unsafe {
      std::env::remove_var("BALLOT_ENCRYPTION_KEY");
      std::env::remove_var("BALLOT_JWT_SECRET");
      std::env::remove_var("BALLOT_VOTES_PER_DAY");
    }
    let cfg = cfg.unwrap();
    assert_eq!(cfg.encryption_key, "007");
    assert_eq!(cfg.jwt_secret, "0123456789");
    assert_eq!(cfg.votes_per_day, 3);
  }

  #[test]
  fn defaults_apply_without_a_config_file() {
    let cfg = ServerConfig::load("/nonexistent/ballot-config.toml").unwrap();
    assert_eq!(cfg.quotas().register, Quota::per_hour(cfg.register_per_hour));
    assert_eq!(cfg.engine_config().args, cfg.engine_args.split_whitespace().collect::<Vec<_>>());
    assert!(!cfg.origins().is_empty());
  }

  #[test]
  fn config_helpers() {
    let mut cfg = ServerConfig::load("/nonexistent/ballot-config.toml").unwrap();
    cfg.allowed_origins = " https://a.example , ,https://b.example".into();
    cfg.jwt_secret = DEV_JWT_SECRET.into();
    cfg.encryption_key = "something-real".into();
    cfg.tls_cert_path = Some("cert.pem".into());
    cfg.tls_key_path = None;

    assert_eq!(cfg.origins(), ["https://a.example", "https://b.example"]);
    assert_eq!(cfg.dev_secrets(), ["jwt_secret"]);
    assert!(cfg.tls_paths().is_none());
  }

  #[tokio::test]
  async fn cors_allows_configured_origin_only() {
    let (t, _) = make_app().await;
    let app = t.app.layer(cors_layer(&["https://vote.example".to_owned()]));

    let preflight = |origin: &'static str| {
      Request::builder()
        .method("OPTIONS")
        .uri("/vote")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
    };

    let resp = app.clone().oneshot(preflight("https://vote.example")).await.unwrap();
    assert_eq!(
      resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
      "https://vote.example"
    );

    let resp = app.oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
  }
}
