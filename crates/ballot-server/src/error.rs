//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{admission::RateLimited, pipeline::SubmitError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Conflict(String),

  #[error("Invalid credentials")]
  InvalidCredentials,

  #[error("No authorization header")]
  MissingToken,

  #[error("Invalid token")]
  InvalidToken,

  #[error("Token has expired")]
  ExpiredToken,

  #[error("Admin access required")]
  Forbidden,

  #[error(transparent)]
  RateLimited(#[from] RateLimited),

  #[error("You have already voted")]
  AlreadyVoted,

  #[error("{0}")]
  NotFound(String),

  #[error("tally engine unavailable: {0}")]
  EngineUnavailable(String),

  /// The engine answered, but with an `ERROR` reply of its own.
  #[error("tally engine error: {0}")]
  EngineError(String),

  #[error("Failed to record vote")]
  EngineRejected,

  #[error("stored vote failed authentication")]
  Tamper,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ApiError::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::InvalidCredentials
      | ApiError::MissingToken
      | ApiError::InvalidToken
      | ApiError::ExpiredToken => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden | ApiError::AlreadyVoted => StatusCode::FORBIDDEN,
      ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::EngineError(_) => StatusCode::BAD_GATEWAY,
      ApiError::EngineUnavailable(_)
      | ApiError::EngineRejected
      | ApiError::Tamper
      | ApiError::Store(_)
      | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Stable machine-readable category, the `code` field of the body.
  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Validation(_) => "validation",
      ApiError::Conflict(_) => "conflict",
      ApiError::InvalidCredentials => "invalid_credentials",
      ApiError::MissingToken | ApiError::InvalidToken => "token_invalid",
      ApiError::ExpiredToken => "token_expired",
      ApiError::Forbidden => "forbidden",
      ApiError::RateLimited(_) => "rate_limited",
      ApiError::AlreadyVoted => "already_voted",
      ApiError::NotFound(_) => "not_found",
      ApiError::EngineUnavailable(_) => "engine_unavailable",
      ApiError::EngineError(_) => "engine_error",
      ApiError::EngineRejected => "engine_rejected",
      ApiError::Tamper => "tamper",
      ApiError::Store(_) => "store",
      ApiError::Internal(_) => "internal",
    }
  }
}

impl From<ballot_crypto::Error> for ApiError {
  fn from(e: ballot_crypto::Error) -> Self {
    use ballot_crypto::Error as E;
    match e {
      E::TokenExpired => ApiError::ExpiredToken,
      E::TokenInvalid => ApiError::InvalidToken,
      E::Tamper => ApiError::Tamper,
      E::Encrypt | E::TokenSigning(_) => ApiError::Internal(e.to_string()),
    }
  }
}

impl From<SubmitError> for ApiError {
  fn from(e: SubmitError) -> Self {
    match e {
      SubmitError::Token(e) | SubmitError::Cipher(e) => e.into(),
      SubmitError::RateLimited(e) => ApiError::RateLimited(e),
      SubmitError::EmptyBallot => ApiError::Validation("Vote content required".into()),
      SubmitError::UnknownVoter(_) => ApiError::NotFound("Voter not found".into()),
      SubmitError::AlreadyVoted => ApiError::AlreadyVoted,
      SubmitError::EngineUnavailable(raw) => ApiError::EngineUnavailable(raw),
      SubmitError::EngineRejected(_) => ApiError::EngineRejected,
      SubmitError::Store(e) => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let code   = self.code();

    let body = match &self {
      ApiError::RateLimited(e) => json!({
        "error":       "Rate limit exceeded",
        "code":        code,
        "message":     e.retry_hint(),
        "retry_after": e.retry_after_secs(),
      }),
      // Storage and internal failures are logged in full but not echoed.
      ApiError::Store(_) | ApiError::Internal(_) | ApiError::Tamper => {
        tracing::error!(error = %self, "request failed");
        json!({ "error": "Internal server error", "code": code })
      }
      _ => json!({ "error": self.to_string(), "code": code }),
    };

    let mut response = (status, Json(body)).into_response();
    if let ApiError::RateLimited(e) = &self {
      response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(e.retry_after_secs()));
    }
    response
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::body::to_bytes;

  use super::*;
  use crate::admission::{Quota, Route};

  async fn render(e: ApiError) -> (StatusCode, serde_json::Value, Response) {
    let response = e.into_response();
    let status   = response.status();
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    let json  = serde_json::from_slice(&bytes).unwrap();
    (status, json, Response::from_parts(parts, axum::body::Body::empty()))
  }

  #[tokio::test]
  async fn already_voted_body() {
    let (status, json, _) = render(ApiError::AlreadyVoted).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "You have already voted");
    assert_eq!(json["code"], "already_voted");
  }

  #[tokio::test]
  async fn rate_limited_carries_retry_after() {
    let err = RateLimited {
      route:       Route::Register,
      quota:       Quota::per_hour(5),
      retry_after: Duration::from_secs(120),
    };
    let (status, json, response) = render(err.into()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["retry_after"], 120);
    assert_eq!(json["message"], "Try again in 2 minutes");
    assert_eq!(response.headers()[header::RETRY_AFTER], "120");
  }

  #[tokio::test]
  async fn partial_seconds_round_up_in_header_and_body() {
    let err = RateLimited {
      route:       Route::Login,
      quota:       Quota::per_hour(10),
      retry_after: Duration::from_millis(1500),
    };
    let (_, json, response) = render(err.into()).await;
    assert_eq!(json["retry_after"], 2);
    assert_eq!(json["message"], "Try again in 2 seconds");
    assert_eq!(response.headers()[header::RETRY_AFTER], "2");
  }

  #[tokio::test]
  async fn store_errors_are_not_echoed() {
    let inner = std::io::Error::other("disk on fire at /var/lib/voters.db");
    let (status, json, _) = render(ApiError::store(inner)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
    assert_eq!(json["code"], "store");
  }

  #[test]
  fn token_errors_map_to_401() {
    let expired: ApiError = ballot_crypto::Error::TokenExpired.into();
    let invalid: ApiError = ballot_crypto::Error::TokenInvalid.into();
    assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(expired.code(), "token_expired");
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
  }
}
