//! Client origin extraction for admission keys and audit entries.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::request::Parts,
};

/// Recorded when the peer address is not known (e.g. in-process tests).
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// The peer IP address of the request, as a string.
///
/// Taken from axum's `ConnectInfo`, so the router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`. Forwarding headers
/// are not trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOrigin(pub String);

impl<S> FromRequestParts<S> for ClientOrigin
where
  S: Send + Sync,
{
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let origin = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
      .await
      .map(|ConnectInfo(addr)| addr.ip().to_string())
      .unwrap_or_else(|_| UNKNOWN_ORIGIN.to_owned());
    Ok(ClientOrigin(origin))
  }
}
