//! API route definitions
//!
//! Required role sets are declared here, next to the routes they guard.
//! `require_auth` wraps every protected route; `require_roles` is layered
//! inside it where a route restricts by role.

use crate::auth::middleware::{require_auth, require_roles};
use crate::handlers::{auth, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use muso_core::UserRole;
use std::sync::Arc;

const MEMBER_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::User];
const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/login", post(auth::login_handler))
        .route("/users", post(users::register_handler));

    // Any authenticated user (empty required-role set)
    let any_authenticated = Router::new()
        .route("/logout", get(auth::logout_handler))
        .route("/me", get(auth::me_handler));

    let member_routes = Router::new()
        .route("/users", get(users::list_users_handler))
        .route("/users/:user_id", get(users::get_user_handler))
        .route_layer(middleware::from_fn(require_roles(MEMBER_ROLES)));

    let admin_routes = Router::new()
        .route("/roles", get(users::roles_handler))
        .route_layer(middleware::from_fn(require_roles(ADMIN_ONLY)));

    let protected_routes = any_authenticated
        .merge(member_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new().merge(public_routes).merge(protected_routes)
}
