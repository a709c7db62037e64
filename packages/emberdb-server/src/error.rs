//! HTTP-boundary error mapping: wraps [`DbError`] into a JSON envelope.
//!
//! Grounded on the teacher's `OperationError`/`ClassifyError` split
//! (`service/operation.rs`): a thin, typed wrapper at the transport
//! boundary, with `anyhow` reserved for genuinely unexpected failures
//! (bad request bodies, I/O during config resolution).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use emberdb_core::DbError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

fn status_for(err: &DbError) -> StatusCode {
    match err {
        DbError::KeyNotFound { .. } => StatusCode::NOT_FOUND,
        DbError::WrongType { .. } => StatusCode::CONFLICT,
        DbError::IndexOutOfRange { .. } | DbError::Parse(_) => StatusCode::BAD_REQUEST,
        DbError::ContractViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DbError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, tag, message) = match &self {
            ApiError::Db(e) => (status_for(e), e.tag(), e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
        };
        (status, Json(json!({ "ok": false, "error": { "tag": tag, "message": message } }))).into_response()
    }
}

/// Wraps a successful payload in the `{ "ok": true, "data": ... }` envelope.
pub fn ok_envelope(data: impl serde::Serialize) -> Response {
    Json(json!({ "ok": true, "data": data })).into_response()
}
