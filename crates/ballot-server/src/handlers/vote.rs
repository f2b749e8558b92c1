//! `POST /vote`: the HTTP face of the submission pipeline.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use ballot_core::store::CredentialStore;
use ballot_engine::EngineChannel;
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::BearerToken,
  error::ApiError,
  origin::ClientOrigin,
  pipeline::Ballot,
};

#[derive(Debug, Default, Deserialize)]
pub struct VoteBody {
  #[serde(default)]
  pub content: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
  pub status:    &'static str,
  pub message:   &'static str,
  pub encrypted: bool,
  pub receipt:   String,
}

/// `POST /vote`, body: `{"content":"…"}`
///
/// The pipeline runs on its own task: once a ballot has been admitted the
/// relay and the store update complete even if the client goes away.
pub async fn handler<S, E>(
  State(state): State<AppState<S, E>>,
  ClientOrigin(origin): ClientOrigin,
  BearerToken(token): BearerToken,
  body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<VoteResponse>, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  // A malformed body is treated as an empty ballot, so token and quota
  // failures still take precedence over it.
  let content  = body.map(|Json(b)| b.content).unwrap_or_default();
  let pipeline = state.pipeline.clone();

  let recorded = tokio::spawn(async move {
    pipeline.submit(Ballot { token, content, origin }).await
  })
  .await
  .map_err(|e| ApiError::Internal(format!("vote task failed: {e}")))??;

  Ok(Json(VoteResponse {
    status:    "success",
    message:   "Vote recorded",
    encrypted: true,
    receipt:   recorded.receipt,
  }))
}
