//! API error handling
//!
//! Every rejection leaving this service has the same wire shape:
//!
//! ```json
//! { "error": { "message": "Unauthorized" } }
//! ```
//!
//! (validation failures carry an `errors` list instead of `message`).
//! Infrastructure detail stays in the logs; clients get the stable message
//! and status code only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::repository::StoreError;
use crate::auth::strategy::AuthError;

/// Error body as serialized to clients
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorMessage {
                message: message.into(),
            },
        }
    }
}

/// Application error type covering the auth core and the user endpoints.
#[derive(Debug)]
pub enum AppError {
    /// Authentication/authorization rejection (carries its own status)
    Auth(AuthError),
    /// Request body failed schema validation
    Validation(validator::ValidationErrors),
    /// Request was well-formed but unacceptable (e.g. weak password)
    BadRequest(String),
    EmailAlreadyUsed,
    UserNotFound,
    /// Path parameter was not a well-formed user id
    InvalidUserId,
    Database(String),
    Internal(String),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Auth(err) => (auth_status(err), err.to_string()),
            AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "Validation error".to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::EmailAlreadyUsed => {
                (StatusCode::CONFLICT, "Email is already used".to_string())
            }
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            AppError::InvalidUserId => (StatusCode::GONE, "User's id is not valid".to_string()),
            AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::NotAuthenticated | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthError::NotEnoughPermissions => StatusCode::FORBIDDEN,
        AuthError::IncorrectCredentials => StatusCode::NOT_FOUND,
        AuthError::TokenPersistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Database(detail) | AppError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "request failed");
        }

        match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": { "errors": errors } })),
            )
                .into_response(),
            other => {
                let (status, message) = other.status_and_message();
                (status, Json(ErrorBody::new(message))).into_response()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::Auth(self).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::EmailAlreadyUsed,
            StoreError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}
