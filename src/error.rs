//! Error taxonomy shared by every store and the HTTP surface.
//!
//! Collapses the many ways a component can fail down to the six buckets the
//! upload pipeline and HTTP handlers actually branch on. Stores and the
//! pipeline should map their underlying failures (sqlx, redis, serde) into one
//! of these rather than leaking the underlying error type upward.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller went away (e.g. the HTTP connection dropped) before a
    /// result could be produced. Never surfaced over HTTP; handlers that see
    /// this should simply stop, not render an error body.
    #[error("cancelled")]
    Cancelled,

    /// A retriable failure in a cache tier (probe timeout, connection drop).
    /// Swallowed by `TwoTierCache` before it ever reaches a handler — a
    /// cache miss, never an error. Distinct from `Durable` so callers can
    /// choose to retry.
    #[error("transient: {0}")]
    Transient(String),

    /// A non-retriable failure: constraint violation, serialization bug,
    /// data corruption.
    #[error("durable: {0}")]
    Durable(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            // Spec §7: database errors are always `Durable`, surfaced as 500
            // with no automatic retry — `Transient` is reserved for the
            // cache tiers, never the relational store.
            other => AppError::Durable(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() || err.is_connection_dropped() || err.is_connection_refusal() {
            AppError::Transient(err.to_string())
        } else {
            AppError::Durable(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Cancelled => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::Transient(_) => {
                tracing::warn!("AppError::Transient reached into_response; cache failures should be swallowed before this point");
                (StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            AppError::Durable(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
