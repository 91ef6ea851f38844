//! Data models for authentication and authorization
//!
//! - `User`: platform account with credentials and profile fields
//! - `IssuedToken`: allow-list entry tracking one live token per user
//!
//! Both map to Postgres tables (`users`, `token_allow_list`) and to the
//! in-memory stores used by tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use muso_core::UserRole;

/// Platform user account.
///
/// The password hash is never serialized; API responses use
/// [`UserPublic`] via [`User::to_public`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// Email address (unique, matched case-insensitively at login)
    pub email: String,

    /// Phone number (optional second login identifier)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Argon2id password hash in PHC string format
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Instrument the musician plays (profile field)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,

    /// Authorization role
    pub role: UserRole,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: String,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            phone_number: None,
            password_hash,
            first_name,
            last_name,
            instrument: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Response projection without credentials.
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            user_id: self.id,
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            instrument: self.instrument.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public user representation (safe for API responses).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub user_id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[schema(value_type = String)]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Allow-list entry for one issued bearer token.
///
/// There is at most one entry per user: issuing a new token replaces the
/// previous entry, which immediately invalidates the old token even though
/// its signature still verifies. Revocation sets `expires_at` to the
/// revocation instant rather than deleting the row, so logouts stay visible
/// in the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Owning user id (upsert key)
    pub user_id: Uuid,

    /// The signed token string (lookup key)
    pub token: String,

    /// Sliding expiration; refreshed on each authenticated request
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn new(user_id: Uuid, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the entry is live at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at >= now
    }
}

/// Submitted login credentials.
///
/// `identifier` is whatever the client typed into the username field; it is
/// resolved against each configured identifier kind in a fixed order (email,
/// then phone number).
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub identifier: String,
    pub password: String,
}
