//! `GET /health`: unauthenticated liveness and headline counts.
//!
//! Served from the credential store alone, so it stays up when the tally
//! engine is missing.

use axum::{Json, extract::State};
use ballot_core::store::CredentialStore;
use ballot_engine::EngineChannel;
use serde::Serialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct Health {
  pub status:            &'static str,
  pub registered_voters: u64,
  pub votes_cast:        u64,
}

pub async fn handler<S, E>(State(state): State<AppState<S, E>>) -> Result<Json<Health>, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  let registered_voters = state.store.count_identities().await.map_err(ApiError::store)?;
  let votes_cast        = state.store.count_voted().await.map_err(ApiError::store)?;
  Ok(Json(Health { status: "healthy", registered_voters, votes_cast }))
}
