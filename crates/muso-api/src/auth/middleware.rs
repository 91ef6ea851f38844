//! Authentication middleware for protecting routes
//!
//! `require_auth` runs the bearer strategy against the `Authorization`
//! header and, on success, attaches an [`AuthenticatedUser`] to the request
//! extensions. `require_roles` layers the authorization gate on top for
//! routes with a required role set.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use muso_core::UserRole;

use super::gate::authorize;
use super::models::User;
use super::strategy::{AuthError, AuthenticationStrategy};
use crate::audit::{audit_log, AuditEvent};
use crate::state::AppState;

/// Authenticated identity attached to request extensions by `require_auth`.
///
/// Handlers extract it with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    /// The verified bearer token (scheme stripped); the logout handler needs
    /// it to revoke the allow-list entry.
    pub token: String,
}

impl AuthenticatedUser {
    fn from_user(user: &User, token: String) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            token,
        }
    }
}

/// Bearer authentication middleware.
///
/// Rejections are terminal 401s; nothing downstream runs without a resolved
/// identity.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let user = match state.bearer.verify(&header_value).await {
        Ok(user) => user,
        Err(err) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: err.to_string(),
            });
            return Err(err);
        }
    };

    let token = header_value
        .as_deref()
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default()
        .trim()
        .to_string();

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from_user(&user, token));

    Ok(next.run(request).await)
}

/// Type alias for the role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware factory for role gating.
///
/// Must be layered inside `require_auth` - it reads the identity that
/// `require_auth` attached. An empty slice admits any authenticated user.
///
/// ```ignore
/// Router::new()
///     .route("/roles", get(roles_handler))
///     .route_layer(middleware::from_fn(require_roles(&[UserRole::Admin])))
///     .route_layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub fn require_roles(
    required: &'static [UserRole],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let identity = request.extensions().get::<AuthenticatedUser>().cloned();

            match authorize(identity.as_ref(), true, required) {
                Ok(_) => Ok(next.run(request).await),
                Err(err) => {
                    audit_log(&AuditEvent::AccessDenied {
                        user_id: identity.as_ref().map(|user| user.user_id),
                        email: identity.map(|user| user.email),
                        required_roles: required.iter().map(|r| r.as_str().to_string()).collect(),
                    });
                    Err(err)
                }
            }
        })
    }
}
