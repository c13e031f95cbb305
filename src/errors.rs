use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::{error::Error, fmt};
use tracing::error;

pub type BoxError = Box<dyn Error + Send + Sync>;

pub const DUPLICATE_EMAIL: &str = "An account with this email already exists.";

/// The two document kinds the API serves, used to phrase error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Post,
}

impl Entity {
    pub fn noun(self) -> &'static str {
        match self {
            Entity::User => "user",
            Entity::Post => "post",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => f.write_str("User"),
            Entity::Post => f.write_str("Post"),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),
    Conflict(String),
    NotFound(Entity),
    /// `action` completes "An error occurred while ...", e.g. "creating the user".
    InternalError {
        action: &'static str,
        cause: BoxError,
    },
}

impl ApiError {
    pub fn invalid_id(entity: Entity) -> Self {
        ApiError::ValidationError(format!(
            "Invalid {} ID format. Must be a number.",
            entity.noun()
        ))
    }

    pub fn internal(action: &'static str, cause: impl Into<BoxError>) -> Self {
        ApiError::InternalError {
            action,
            cause: cause.into(),
        }
    }

    /// Maps a store failure. A unique-email violation reported by the store is
    /// the same conflict the pre-insert lookup reports.
    pub fn from_store(action: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { field: "email" } => {
                ApiError::Conflict(DUPLICATE_EMAIL.into())
            }
            other => ApiError::internal(action, other),
        }
    }
}

/// Convert our custom errors to HTTP responses
///
/// Internal causes are logged here and never reach the response body.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::NotFound(entity) => (StatusCode::NOT_FOUND, format!("{entity} not found")),
            ApiError::InternalError { action, cause } => {
                error!(
                    action,
                    error = cause.as_ref() as &(dyn Error + 'static),
                    "request failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("An error occurred while {action}."),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({
              "error": message
            })),
        )
            .into_response()
    }
}
