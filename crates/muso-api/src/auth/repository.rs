//! Storage layer for authentication entities
//!
//! Two storage contracts back the auth subsystem:
//! - [`UserStore`]: credential store lookups (plus the mutations the
//!   registration and listing endpoints need)
//! - [`TokenAllowList`]: the server-side record of currently-valid issued
//!   tokens, one entry per user
//!
//! Both ship with a Postgres implementation and an in-memory implementation.
//! The in-memory variants back the integration tests and single-node
//! development; they observe the same upsert/lazy-expiry semantics as the
//! Postgres ones.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE users (
//!     id            UUID PRIMARY KEY,
//!     email         TEXT NOT NULL UNIQUE,
//!     phone_number  TEXT UNIQUE,
//!     password_hash TEXT NOT NULL,
//!     first_name    TEXT,
//!     last_name     TEXT,
//!     instrument    TEXT,
//!     role          TEXT NOT NULL,
//!     created_at    TIMESTAMPTZ NOT NULL,
//!     updated_at    TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE token_allow_list (
//!     user_id    UUID PRIMARY KEY REFERENCES users (id),
//!     token      TEXT NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX token_allow_list_token_idx ON token_allow_list (token);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{IssuedToken, User};
use muso_core::UserRole;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Email already exists")]
    DuplicateEmail,
}

/// Credential store contract.
///
/// Email lookups are case-insensitive; phone lookups are exact.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_phone_number(&self, phone_number: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: User) -> Result<User, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

/// Allow-list contract: one live token per user.
#[async_trait]
pub trait TokenAllowList: Send + Sync {
    /// Record a freshly issued token, replacing any existing entry for the
    /// user. Replacement immediately invalidates the user's previous token.
    async fn upsert(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Fetch the entry for `token` if it has not expired. Expired entries
    /// behave as not-found (lazy expiry; no background sweep required).
    async fn lookup_active(&self, token: &str) -> Result<Option<IssuedToken>, StoreError>;

    /// Slide the expiration forward. Only still-active entries are
    /// refreshed: a refresh racing a revocation or a replacement must not
    /// resurrect the token. Zero matched rows is not an error.
    async fn touch(&self, token: &str, new_expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Expire the entry now (logout). Idempotent: unknown tokens are ignored.
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;
}

// =============================================================================
// Postgres implementations
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    phone_number: Option<String>,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    instrument: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = UserRole::from_str(&row.role)
            .map_err(|e| StoreError::Database(format!("corrupt role column: {e}")))?;

        Ok(User {
            id: row.id,
            email: row.email,
            phone_number: row.phone_number,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            instrument: row.instrument,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, phone_number, password_hash, first_name, last_name, \
                            instrument, role, created_at, updated_at";

/// Postgres-backed credential store
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE phone_number = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(User::try_from).transpose()
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            "INSERT INTO users (id, email, phone_number, password_hash, first_name, last_name, \
             instrument, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.instrument)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            other => StoreError::Database(other.to_string()),
        })?;

        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter().map(User::try_from).collect()
    }
}

/// Postgres-backed token allow-list
pub struct PgTokenAllowList {
    pool: PgPool,
}

impl PgTokenAllowList {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IssuedTokenRow {
    user_id: Uuid,
    token: String,
    expires_at: DateTime<Utc>,
}

#[async_trait]
impl TokenAllowList for PgTokenAllowList {
    async fn upsert(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO token_allow_list (user_id, token, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE \
             SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn lookup_active(&self, token: &str) -> Result<Option<IssuedToken>, StoreError> {
        let row = sqlx::query_as::<_, IssuedTokenRow>(
            "SELECT user_id, token, expires_at FROM token_allow_list \
             WHERE token = $1 AND expires_at >= NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(row.map(|r| IssuedToken::new(r.user_id, r.token, r.expires_at)))
    }

    async fn touch(&self, token: &str, new_expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE token_allow_list SET expires_at = $2 \
             WHERE token = $1 AND expires_at >= NOW()",
        )
        .bind(token)
        .bind(new_expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE token_allow_list SET expires_at = NOW() WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

// =============================================================================
// In-memory implementations (tests, single-node development)
// =============================================================================

/// In-memory credential store
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.phone_number.as_deref() == Some(phone_number))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::DuplicateEmail);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

/// In-memory token allow-list
///
/// Keyed by user id to get the one-entry-per-user upsert for free; token
/// lookups scan the (small) map.
#[derive(Default)]
pub struct InMemoryTokenAllowList {
    entries: RwLock<HashMap<Uuid, IssuedToken>>,
}

impl InMemoryTokenAllowList {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenAllowList for InMemoryTokenAllowList {
    async fn upsert(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(user_id, IssuedToken::new(user_id, token, expires_at));
        Ok(())
    }

    async fn lookup_active(&self, token: &str) -> Result<Option<IssuedToken>, StoreError> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|entry| entry.token == token && entry.is_active(now))
            .cloned())
    }

    async fn touch(&self, token: &str, new_expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries
            .values_mut()
            .find(|entry| entry.token == token && entry.is_active(now))
        {
            entry.expires_at = new_expires_at;
        }
        Ok(())
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.values_mut().find(|entry| entry.token == token) {
            entry.expires_at = now;
        }
        Ok(())
    }
}
