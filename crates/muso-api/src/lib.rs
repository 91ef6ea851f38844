//! Muso API - REST server for the musicians' networking platform
//!
//! The implemented surface is the authentication/authorization core: login,
//! logout, registration, and the protected user endpoints that exercise the
//! role gate. Entity listings (events, partners, partnerships, vacancies)
//! are separate services that consume the identity this crate resolves.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{InMemoryTokenAllowList, InMemoryUserStore};
use crate::state::AppState;
use muso_core::AppConfig;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login_handler,
        handlers::auth::logout_handler,
        handlers::auth::me_handler,
        handlers::users::register_handler,
        handlers::users::list_users_handler,
        handlers::users::get_user_handler,
        handlers::users::roles_handler,
        handlers::health::health_check,
    ),
    components(schemas(
        auth::LoginRequest,
        auth::LoginResponse,
        auth::RegisterRequest,
        auth::MessageResponse,
        auth::UserPublic,
        error::ErrorBody,
        error::ErrorMessage,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, logout and session identity"),
        (name = "users", description = "User accounts and roles"),
        (name = "health", description = "Liveness and metrics"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Request counting middleware feeding the `/metrics` endpoint.
async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    state.increment_requests();
    next.run(request).await
}

fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full application router over the given state.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api/v1", routes::api_routes(Arc::clone(&state)))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Router over in-memory stores, for tests and local experiments.
///
/// Uses a fixed development secret; integration tests that need to seed the
/// stores construct [`AppState`] themselves and call [`create_router`].
pub fn create_router_for_testing() -> Router {
    let mut config = AppConfig::default();
    config.auth.session_secret = "test-session-secret".to_string();

    let users = Arc::new(InMemoryUserStore::new());
    let allow_list = Arc::new(InMemoryTokenAllowList::new());

    create_router(Arc::new(AppState::new(config, users, allow_list)))
}
