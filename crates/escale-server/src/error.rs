//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use escale_api::{ApiError, error::GENERIC_ERROR};
use escale_core::account::MSG_BAD_CREDENTIALS;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("forbidden: {0}")]
  Forbidden(String),
  #[error("not found: {0}")]
  NotFound(String),
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error(transparent)]
  Core(#[from] escale_core::Error),
  #[error(transparent)]
  Api(#[from] ApiError),
  #[error("internal error: {0}")]
  Internal(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// For `.map_err(store)` on any `MarketplaceStore` call.
pub(crate) fn store<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}

fn body(status: StatusCode, message: impl Into<String>) -> Response {
  (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = body(StatusCode::UNAUTHORIZED, MSG_BAD_CREDENTIALS);
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer realm=\"escale\""),
        );
        res
      }
      Error::Forbidden(msg) => body(StatusCode::FORBIDDEN, msg),
      Error::NotFound(msg) => body(StatusCode::NOT_FOUND, msg),
      Error::Conflict(msg) => body(StatusCode::CONFLICT, msg),
      Error::BadRequest(msg) => body(StatusCode::BAD_REQUEST, msg),
      Error::Core(escale_core::Error::Serialization(e)) => {
        tracing::error!(error = %e, "serialization failure");
        body(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR)
      }
      Error::Core(e) => body(StatusCode::BAD_REQUEST, e.to_string()),
      Error::Api(e) => e.into_response(),
      Error::Internal(msg) => {
        tracing::error!(%msg, "internal failure");
        body(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR)
      }
      Error::Store(e) => {
        tracing::error!(error = %e, "store failure");
        body(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unauthorized_carries_challenge() {
    let res = Error::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[test]
  fn validation_is_a_bad_request() {
    let res = Error::from(escale_core::Error::validation("Veuillez remplir tous les champs"))
      .into_response();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn store_failures_are_opaque() {
    let io = std::io::Error::other("disk on fire");
    let res = store(io).into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
