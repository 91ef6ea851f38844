//! Application state management

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use muso_core::AppConfig;

use crate::auth::{AuthService, BearerStrategy, TokenAllowList, UserStore};

/// Application state shared across handlers and middleware.
///
/// Configuration is read-only after construction; the stores are the only
/// mutable resources and they manage their own synchronization.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Login/logout/registration service
    pub auth: AuthService,
    /// Per-request bearer verification
    pub bearer: BearerStrategy,
}

impl AppState {
    /// Create application state over the given stores.
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        allow_list: Arc<dyn TokenAllowList>,
    ) -> Self {
        let auth = AuthService::new(
            Arc::clone(&users),
            Arc::clone(&allow_list),
            config.auth.session_secret.clone(),
            config.auth.access_token_expires_mins,
        );
        let bearer = BearerStrategy::new(
            users,
            allow_list,
            config.auth.session_secret.clone(),
            config.auth.access_token_expires_mins,
        );

        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            auth,
            bearer,
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
