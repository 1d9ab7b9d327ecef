//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use logit_ledger::LedgerError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The principal headers are missing or malformed.
  #[error("unauthenticated: {0}")]
  Unauthenticated(String),

  /// The principal is known but lacks the role this route needs.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error(transparent)]
  Ledger(#[from] LedgerError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Unauthenticated(_) => {
        (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() }))
      }
      ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, json!({ "error": self.to_string() })),
      ApiError::Ledger(e) => ledger_response(e),
    };
    (status, Json(body)).into_response()
  }
}

fn ledger_response(e: &LedgerError) -> (StatusCode, serde_json::Value) {
  let message = e.to_string();
  match e {
    LedgerError::Validation { error, index } => (
      StatusCode::BAD_REQUEST,
      json!({ "error": message, "field": error.field, "reason": error.reason, "index": index }),
    ),
    LedgerError::Conflict { kind, index } => (
      StatusCode::CONFLICT,
      json!({ "error": message, "conflict": kind, "index": index }),
    ),
    LedgerError::Unauthorized => (StatusCode::FORBIDDEN, json!({ "error": message })),
    LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": message })),
    LedgerError::Timeout => (StatusCode::GATEWAY_TIMEOUT, json!({ "error": message })),
    LedgerError::Contention(_) | LedgerError::RetriesExhausted(_) => {
      (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message }))
    }
    LedgerError::Store(_) | LedgerError::Inconsistent(_) => {
      tracing::error!(error = %e, "request failed");
      (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
    }
  }
}
