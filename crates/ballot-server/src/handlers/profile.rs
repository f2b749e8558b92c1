//! `GET /profile`

use axum::{Json, extract::State};
use ballot_core::{identity::Identity, store::CredentialStore};
use ballot_engine::EngineChannel;

use crate::{AppState, auth::AuthenticatedVoter, error::ApiError};

/// The caller's own identity record (password hash omitted by serialization).
pub async fn handler<S, E>(
  State(state): State<AppState<S, E>>,
  AuthenticatedVoter(claims): AuthenticatedVoter,
) -> Result<Json<Identity>, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  state
    .store
    .find_by_id(claims.voter_id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("Voter not found".into()))
}
