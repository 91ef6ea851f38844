//! User account handlers
//!
//! Registration is public; the listing and lookup endpoints require an
//! authenticated member, and the roles endpoint is admin-only. Role sets are
//! declared in the router (`routes.rs`).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{MessageResponse, RegisterRequest, UserPublic};
use crate::error::AppError;
use crate::state::AppState;

/// Register a new user account
///
/// New accounts get the `USER` role.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 409, description = "Email is already used", body = crate::error::ErrorBody),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List all users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = [UserPublic]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
        (status = 403, description = "Not enough permissions", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let users = state.auth.list_users().await?;
    Ok(Json(users))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserPublic),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
        (status = 410, description = "User's id is not valid", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = Uuid::parse_str(&user_id).map_err(|_| AppError::InvalidUserId)?;
    let user = state.auth.get_user(user_id).await?;
    Ok(Json(user))
}

/// List the role vocabulary (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "users",
    responses(
        (status = 200, description = "Role names", body = [String]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
        (status = 403, description = "Not enough permissions", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn roles_handler(State(state): State<Arc<AppState>>) -> Json<Vec<&'static str>> {
    Json(state.auth.roles())
}
