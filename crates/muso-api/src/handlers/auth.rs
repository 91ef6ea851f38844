//! Login/logout handlers
//!
//! `POST /login` is public; `GET /logout` and `GET /me` sit behind the
//! bearer middleware with an empty required-role set (any authenticated
//! user).

use axum::{extract::State, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use crate::auth::{AuthenticatedUser, LoginRequest, LoginResponse, MessageResponse, UserPublic};
use crate::error::AppError;
use crate::state::AppState;

/// Login with an identifier and password
///
/// Issues a signed bearer token and records it on the allow-list. The
/// response repeats the public profile fields and carries the full
/// `Bearer ...` header value in `token`.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error", body = crate::error::ErrorBody),
        (status = 404, description = "Incorrect username or password", body = crate::error::ErrorBody),
        (status = 500, description = "Token could not be recorded", body = crate::error::ErrorBody),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let response = state.auth.login(request).await?;
    Ok(Json(response))
}

/// Logout the current session
///
/// Revokes the presented token on the allow-list. Always reports success;
/// a failed revocation only means the token lives until natural expiry.
#[utoipa::path(
    get,
    path = "/api/v1/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<MessageResponse> {
    let response = state
        .auth
        .logout(user.user_id, &user.email, &user.token)
        .await;
    Json(response)
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user profile", body = UserPublic),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.auth.get_user(user.user_id).await?;
    Ok(Json(profile))
}
