//! Admin-only handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/status` | Engine `STATUS` reply, verbatim |
//! | `GET`  | `/tally`  | Engine `TALLY` reply, verbatim |
//! | `GET`  | `/admin/stats` | Registration and turnout counts |
//! | `GET`  | `/admin/audit` | Optional `?voter_id=<id>&limit=<n>` |

use axum::{
  Json,
  extract::{Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use ballot_core::{
  audit::AuditEntry,
  identity::VoterId,
  store::{AuditQuery, CredentialStore},
};
use ballot_engine::{EngineChannel, EngineCommand, is_unavailable};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::AdminVoter, error::ApiError};

// ─── Engine passthrough ──────────────────────────────────────────────────────

/// `GET /status`
pub async fn status<S, E>(
  State(state): State<AppState<S, E>>,
  AdminVoter(_): AdminVoter,
) -> Result<Response, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  relay(&state, EngineCommand::Status).await
}

/// `GET /tally`
pub async fn tally<S, E>(
  State(state): State<AppState<S, E>>,
  AdminVoter(_): AdminVoter,
) -> Result<Response, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  relay(&state, EngineCommand::Tally).await
}

/// The engine speaks JSON on these commands; it is passed through unparsed.
async fn relay<S, E>(state: &AppState<S, E>, command: EngineCommand) -> Result<Response, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  let verb  = command.to_string();
  let reply = state.engine.send(command).await;
  if is_unavailable(&reply) {
    return Err(ApiError::EngineUnavailable(reply));
  }
  if reply.starts_with("ERROR") {
    tracing::warn!(command = %verb, reply = %reply, "engine returned an error");
    return Err(ApiError::EngineError(reply));
  }
  Ok(([(header::CONTENT_TYPE, "application/json")], reply).into_response())
}

// ─── Stats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Stats {
  pub total_registered:   u64,
  pub total_voted:        u64,
  pub turnout_percentage: f64,
}

/// `GET /admin/stats`
pub async fn stats<S, E>(
  State(state): State<AppState<S, E>>,
  AdminVoter(_): AdminVoter,
) -> Result<Json<Stats>, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  let total_registered = state.store.count_identities().await.map_err(ApiError::store)?;
  let total_voted      = state.store.count_voted().await.map_err(ApiError::store)?;
  Ok(Json(Stats {
    total_registered,
    total_voted,
    turnout_percentage: turnout(total_voted, total_registered),
  }))
}

/// Percentage rounded to two decimals; zero when nobody is registered.
fn turnout(voted: u64, registered: u64) -> f64 {
  if registered == 0 {
    return 0.0;
  }
  (voted as f64 / registered as f64 * 10_000.0).round() / 100.0
}

// ─── Audit ───────────────────────────────────────────────────────────────────

const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct AuditParams {
  pub voter_id: Option<VoterId>,
  pub limit:    Option<usize>,
}

/// `GET /admin/audit[?voter_id=<id>][&limit=<n>]`: most recent entries, oldest first.
pub async fn audit<S, E>(
  State(state): State<AppState<S, E>>,
  AdminVoter(admin): AdminVoter,
  Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditEntry>>, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  let query = AuditQuery {
    voter_id: params.voter_id,
    limit:    Some(params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(MAX_AUDIT_LIMIT)),
  };
  tracing::info!(admin = admin.voter_id, voter_id = ?query.voter_id, "audit log read");
  let entries = state.store.list_audit(&query).await.map_err(ApiError::store)?;
  Ok(Json(entries))
}
