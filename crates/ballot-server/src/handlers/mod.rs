pub mod accounts;
pub mod admin;
pub mod health;
pub mod profile;
pub mod vote;

use axum::{Json, extract::rejection::JsonRejection};

use crate::error::ApiError;

/// Unwrap a JSON body, turning a malformed one into a 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
  body
    .map(|Json(b)| b)
    .map_err(|e| ApiError::Validation(e.body_text()))
}

/// Run CPU-bound work (password hashing) off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
  F: FnOnce() -> Result<T, ApiError> + Send + 'static,
  T: Send + 'static,
{
  tokio::task::spawn_blocking(f)
    .await
    .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
