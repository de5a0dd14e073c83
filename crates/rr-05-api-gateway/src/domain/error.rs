//! API error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rr_04_command_handler::CommandError;
use serde_json::json;
use shared_types::{EntityId, StoreError};
use thiserror::Error;

/// Everything a request can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The path id is not an entity id.
    #[error("Invalid entity id: {0}")]
    InvalidId(String),

    /// The body is not a valid update.
    #[error("Invalid body: {0}")]
    InvalidBody(String),

    #[error("Entity {0} not found")]
    NotFound(EntityId),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Record store failure: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidId(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Command(e) => match e {
                CommandError::MissingRequestId => StatusCode::BAD_REQUEST,
                CommandError::Duplicate { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CommandError::VersionConflict { .. } => StatusCode::CONFLICT,
                CommandError::Store(_)
                | CommandError::Timeout { .. }
                | CommandError::ReplicationPending { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Command(CommandError::ReplicationPending { record, .. }) => json!({
                "error": self.to_string(),
                "record": record,
                "replicated": false,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
