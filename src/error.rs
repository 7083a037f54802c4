//! HTTP error mapping for domain errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::session::SessionError;
use crate::state::export::SnapshotError;
use crate::state::progress::ProgressError;
use crate::state::session::PlayError;
use crate::store::StoreError;
use crate::types::{GameId, UnknownGame};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// Transient backend failure; the client may retry
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// Game already completed; the client should return to the dashboard
    #[error("{0} has already been completed")]
    AlreadyCompleted(GameId),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) | ApiError::AlreadyCompleted(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            ApiError::AlreadyCompleted(game) => json!({
                "error": self.to_string(),
                "game": game,
                "redirect": "/dashboard",
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(format!("No record for {id}")),
            other => ApiError::Unavailable(other.to_string()),
        }
    }
}

impl From<ProgressError> for ApiError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::NotFound(_) => ApiError::NotFound(e.to_string()),
            ProgressError::Store(inner) => inner.into(),
            ProgressError::InvalidScore(_) => ApiError::BadRequest(e.to_string()),
            ProgressError::Locked { .. } => ApiError::Forbidden(e.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<PlayError> for ApiError {
    fn from(e: PlayError) -> Self {
        match e {
            PlayError::SessionNotFound => ApiError::NotFound(e.to_string()),
            PlayError::AlreadyCompleted(game) => ApiError::AlreadyCompleted(game),
            PlayError::Session(inner) => inner.into(),
            PlayError::Progress(inner) => inner.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidName | AuthError::InvalidEmail | AuthError::WeakPassword(_) => {
                ApiError::BadRequest(e.to_string())
            }
            AuthError::EmailInUse => ApiError::Conflict(e.to_string()),
            AuthError::InvalidCredentials | AuthError::Unauthorized => {
                ApiError::Unauthorized(e.to_string())
            }
        }
    }
}

impl From<SnapshotError> for ApiError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::Invalid(_) | SnapshotError::Json(_) => {
                ApiError::BadRequest(e.to_string())
            }
            SnapshotError::Store(inner) => inner.into(),
            SnapshotError::Io(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<UnknownGame> for ApiError {
    fn from(e: UnknownGame) -> Self {
        ApiError::NotFound(e.to_string())
    }
}
