//! Muso API server
//!
//! REST API for the musicians' networking platform.

use muso_api::auth::{PgTokenAllowList, PgUserStore};
use muso_api::{create_router, state::AppState};
use muso_core::AppConfig;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muso_api=debug,tower_http=debug".into()),
        )
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Connect the backing store; its lifecycle belongs here, not to the
    // auth components.
    let pool = PgPoolOptions::new()
        .max_connections(config.database.pool_size)
        .connect(&config.database.url)
        .await?;

    let users = Arc::new(PgUserStore::new(pool.clone()));
    let allow_list = Arc::new(PgTokenAllowList::new(pool));

    // Create application state and router
    let state = Arc::new(AppState::new(config, users, allow_list));
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Muso API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
