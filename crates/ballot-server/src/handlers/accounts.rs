//! Handlers for `/register` and `/login`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/register` | Body: `{"email","password","full_name"}`; 201 with a token |
//! | `POST` | `/login`    | Body: `{"email","password"}`; 401 on any mismatch |
//!
//! Both routes are admitted per client origin before the body is looked at.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use ballot_core::{
  audit::{AuditAction, NewAuditEntry},
  identity::{NewIdentity, VoterId, normalize_email, validate_credentials},
  store::{CreateOutcome, CredentialStore},
};
use ballot_engine::EngineChannel;
use serde::{Deserialize, Serialize};

use super::{blocking, json_body};
use crate::{
  AppState,
  admission::Route,
  auth::{hash_password, verify_password},
  error::ApiError,
  origin::ClientOrigin,
};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
  pub message:   &'static str,
  pub token:     String,
  pub voter_id:  VoterId,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub has_voted: Option<bool>,
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  #[serde(default)]
  pub email:     String,
  #[serde(default)]
  pub password:  String,
  #[serde(default)]
  pub full_name: Option<String>,
}

/// `POST /register`
pub async fn register<S, E>(
  State(state): State<AppState<S, E>>,
  ClientOrigin(origin): ClientOrigin,
  body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  state.admission.check_and_increment(Route::Register, &origin)?;

  let body  = json_body(body)?;
  let email = normalize_email(&body.email);
  validate_credentials(&email, &body.password)
    .map_err(|e| ApiError::Validation(e.to_string()))?;

  let password = body.password;
  let hash     = blocking(move || hash_password(&password)).await?;

  let identity = match state
    .store
    .create_identity(NewIdentity::voter(&email, hash, body.full_name))
    .await
    .map_err(ApiError::store)?
  {
    CreateOutcome::Created(identity) => identity,
    CreateOutcome::EmailTaken => {
      return Err(ApiError::Conflict("Email already registered".into()));
    }
  };

  state
    .store
    .append_audit(
      NewAuditEntry::new(Some(identity.voter_id), AuditAction::Register)
        .detail("User registered")
        .origin(origin.as_str()),
    )
    .await
    .map_err(ApiError::store)?;

  let token = state.tokens.issue(identity.voter_id, &identity.email, identity.is_admin)?;
  tracing::info!(voter_id = identity.voter_id, %origin, "voter registered");

  Ok((
    StatusCode::CREATED,
    Json(SessionResponse {
      message:   "Registration successful",
      token,
      voter_id:  identity.voter_id,
      has_voted: None,
    }),
  ))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

/// `POST /login`
pub async fn login<S, E>(
  State(state): State<AppState<S, E>>,
  ClientOrigin(origin): ClientOrigin,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError>
where
  S: CredentialStore + 'static,
  E: EngineChannel + 'static,
{
  state.admission.check_and_increment(Route::Login, &origin)?;

  let body  = json_body(body)?;
  let email = normalize_email(&body.email);
  if email.is_empty() || body.password.is_empty() {
    return Err(ApiError::Validation("Email and password required".into()));
  }

  let Some(identity) = state.store.find_by_email(&email).await.map_err(ApiError::store)? else {
    state
      .store
      .append_audit(
        NewAuditEntry::new(None, AuditAction::LoginFailed)
          .detail("Login attempt for unknown email")
          .origin(origin.as_str()),
      )
      .await
      .map_err(ApiError::store)?;
    tracing::info!(%origin, "login failed: unknown email");
    return Err(ApiError::InvalidCredentials);
  };

  let password = body.password;
  let phc      = identity.password_hash.clone();
  let matches  = blocking(move || Ok(verify_password(&password, &phc))).await?;

  if !matches {
    state
      .store
      .append_audit(
        NewAuditEntry::new(Some(identity.voter_id), AuditAction::LoginFailed)
          .detail("Invalid password")
          .origin(origin.as_str()),
      )
      .await
      .map_err(ApiError::store)?;
    tracing::info!(voter_id = identity.voter_id, %origin, "login failed: wrong password");
    return Err(ApiError::InvalidCredentials);
  }

  state
    .store
    .append_audit(
      NewAuditEntry::new(Some(identity.voter_id), AuditAction::Login)
        .detail("User logged in")
        .origin(origin.as_str()),
    )
    .await
    .map_err(ApiError::store)?;

  let token = state.tokens.issue(identity.voter_id, &identity.email, identity.is_admin)?;
  tracing::info!(voter_id = identity.voter_id, %origin, "voter logged in");

  Ok(Json(SessionResponse {
    message:   "Login successful",
    token,
    voter_id:  identity.voter_id,
    has_voted: Some(identity.has_voted),
  }))
}
