//! Authentication strategies
//!
//! Two ways a request can prove who it is:
//! - [`PasswordStrategy`]: login-time verification of submitted credentials
//!   against the credential store
//! - [`BearerStrategy`]: per-request verification of a signed bearer token,
//!   combining the signature check with allow-list membership
//!
//! Each strategy is a single `verify` call producing either an authenticated
//! [`User`] or a terminal [`AuthError`]. The bearer strategy is where the
//! stateless-token / stateful-allow-list hybrid pays off: the signature alone
//! is not enough, the token must also still be on the allow-list, which is
//! what makes logout and single-active-session revocation effective against
//! tokens whose signatures remain valid.

use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

use super::jwt;
use super::models::{LoginCredentials, User};
use super::password::verify_password;
use super::repository::{TokenAllowList, UserStore};

/// Terminal authentication/authorization failures.
///
/// Messages are the exact client-visible wording; status codes are attached
/// in the error layer. Incorrect credentials deliberately do not reveal
/// whether the identifier or the password was wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No authenticated")]
    NotAuthenticated,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not enough permissions")]
    NotEnoughPermissions,

    #[error("Incorrect username or password")]
    IncorrectCredentials,

    #[error("Token is not created")]
    TokenPersistence,
}

/// Common shape of a verification strategy: one credential type in, an
/// authenticated user or a terminal rejection out.
pub trait AuthenticationStrategy {
    type Credentials;

    fn verify(
        &self,
        credentials: &Self::Credentials,
    ) -> impl std::future::Future<Output = Result<User, AuthError>> + Send;
}

/// Login-time password verification.
#[derive(Clone)]
pub struct PasswordStrategy {
    users: Arc<dyn UserStore>,
}

impl PasswordStrategy {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Resolve a login identifier against each identifier kind in fixed
    /// order: email first, then phone number.
    async fn resolve_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError> {
        let by_email = self.users.find_by_email(identifier).await.map_err(|err| {
            tracing::warn!(error = %err, "credential store lookup failed during login");
            AuthError::IncorrectCredentials
        })?;
        if by_email.is_some() {
            return Ok(by_email);
        }

        self.users
            .find_by_phone_number(identifier)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "credential store lookup failed during login");
                AuthError::IncorrectCredentials
            })
    }
}

impl AuthenticationStrategy for PasswordStrategy {
    type Credentials = LoginCredentials;

    async fn verify(&self, credentials: &LoginCredentials) -> Result<User, AuthError> {
        let identifier = credentials.identifier.trim();

        // Unknown identifier and wrong password collapse into the same
        // rejection so the endpoint cannot be used to enumerate accounts.
        let user = self
            .resolve_identifier(identifier)
            .await?
            .ok_or(AuthError::IncorrectCredentials)?;

        let matches = verify_password(&credentials.password, &user.password_hash).map_err(|err| {
            tracing::warn!(error = %err, "stored password hash is unusable");
            AuthError::IncorrectCredentials
        })?;

        if matches {
            Ok(user)
        } else {
            Err(AuthError::IncorrectCredentials)
        }
    }
}

/// Per-request bearer token verification.
#[derive(Clone)]
pub struct BearerStrategy {
    users: Arc<dyn UserStore>,
    allow_list: Arc<dyn TokenAllowList>,
    secret: String,
    sliding_window: Duration,
}

impl BearerStrategy {
    pub fn new(
        users: Arc<dyn UserStore>,
        allow_list: Arc<dyn TokenAllowList>,
        secret: impl Into<String>,
        sliding_window_mins: i64,
    ) -> Self {
        Self {
            users,
            allow_list,
            secret: secret.into(),
            sliding_window: Duration::minutes(sliding_window_mins),
        }
    }

    /// Strip the `Bearer` scheme from an `Authorization` header value.
    fn extract_token(header: Option<&str>) -> Result<&str, AuthError> {
        let header = header.ok_or(AuthError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::Unauthorized)?
            .trim();

        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        Ok(token)
    }
}

impl AuthenticationStrategy for BearerStrategy {
    type Credentials = Option<String>;

    /// Verify the raw `Authorization` header value.
    ///
    /// Signature check, allow-list membership, then a fresh user lookup so a
    /// role change since issuance takes effect immediately. A store that
    /// cannot be reached reads as an invalid session - never as a valid one.
    /// On success the allow-list expiry is slid forward on a detached task;
    /// the response does not wait for it and its failure cannot fail the
    /// request.
    async fn verify(&self, authorization: &Option<String>) -> Result<User, AuthError> {
        let token = Self::extract_token(authorization.as_deref())?;

        let claims =
            jwt::verify_token(&self.secret, token).map_err(|_| AuthError::Unauthorized)?;

        let entry = self
            .allow_list
            .lookup_active(token)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "allow-list lookup failed; rejecting request");
                AuthError::Unauthorized
            })?
            .ok_or(AuthError::Unauthorized)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "user lookup failed; rejecting request");
                AuthError::Unauthorized
            })?
            .ok_or(AuthError::Unauthorized)?;

        let new_expiry = Utc::now() + self.sliding_window;
        let allow_list = Arc::clone(&self.allow_list);
        let refreshed_token = entry.token;
        tokio::spawn(async move {
            if let Err(err) = allow_list.touch(&refreshed_token, new_expiry).await {
                tracing::warn!(error = %err, "token expire time not updated");
            }
        });

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::IssuedToken;
    use crate::auth::password::hash_password;
    use crate::auth::repository::{InMemoryTokenAllowList, InMemoryUserStore, StoreError};
    use async_trait::async_trait;
    use chrono::DateTime;
    use muso_core::UserRole;
    use uuid::Uuid;

    const SECRET: &str = "strategy-test-secret";

    async fn seeded_store(password: &str) -> (Arc<InMemoryUserStore>, User) {
        let store = Arc::new(InMemoryUserStore::new());
        let user = User::new(
            "user@example.com".to_string(),
            hash_password(password).unwrap(),
            Some("Miles".to_string()),
            Some("Davis".to_string()),
            UserRole::User,
        )
        .with_phone_number("+4915112345678");
        store.insert(user.clone()).await.unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn test_password_strategy_accepts_valid_credentials() {
        let (store, user) = seeded_store("password123!A").await;
        let strategy = PasswordStrategy::new(store);

        let verified = strategy
            .verify(&LoginCredentials {
                identifier: "user@example.com".to_string(),
                password: "password123!A".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(verified.id, user.id);
    }

    #[tokio::test]
    async fn test_password_strategy_resolves_phone_number() {
        let (store, user) = seeded_store("password123!A").await;
        let strategy = PasswordStrategy::new(store);

        let verified = strategy
            .verify(&LoginCredentials {
                identifier: "+4915112345678".to_string(),
                password: "password123!A".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(verified.id, user.id);
    }

    #[tokio::test]
    async fn test_password_strategy_uniform_rejection() {
        let (store, _) = seeded_store("password123!A").await;
        let strategy = PasswordStrategy::new(store);

        let wrong_password = strategy
            .verify(&LoginCredentials {
                identifier: "user@example.com".to_string(),
                password: "not-the-password1!A".to_string(),
            })
            .await
            .unwrap_err();

        let unknown_identifier = strategy
            .verify(&LoginCredentials {
                identifier: "nobody@example.com".to_string(),
                password: "password123!A".to_string(),
            })
            .await
            .unwrap_err();

        // Identical rejection for both cases; no account enumeration.
        assert_eq!(wrong_password, AuthError::IncorrectCredentials);
        assert_eq!(unknown_identifier, AuthError::IncorrectCredentials);
    }

    async fn issued_bearer(allow_list: &Arc<InMemoryTokenAllowList>, user: &User) -> String {
        let token = jwt::sign_token(SECRET, user).unwrap();
        allow_list
            .upsert(user.id, &token, Utc::now() + Duration::minutes(30))
            .await
            .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn test_bearer_strategy_happy_path() {
        let (store, user) = seeded_store("password123!A").await;
        let allow_list = Arc::new(InMemoryTokenAllowList::new());
        let header = issued_bearer(&allow_list, &user).await;

        let strategy = BearerStrategy::new(store, allow_list, SECRET, 30);
        let verified = strategy.verify(&Some(header)).await.unwrap();
        assert_eq!(verified.id, user.id);
    }

    #[tokio::test]
    async fn test_bearer_strategy_rejects_missing_and_malformed_headers() {
        let (store, _) = seeded_store("password123!A").await;
        let allow_list = Arc::new(InMemoryTokenAllowList::new());
        let strategy = BearerStrategy::new(store, allow_list, SECRET, 30);

        assert_eq!(
            strategy.verify(&None).await.unwrap_err(),
            AuthError::Unauthorized
        );
        assert_eq!(
            strategy
                .verify(&Some("Basic dXNlcjpwdw==".to_string()))
                .await
                .unwrap_err(),
            AuthError::Unauthorized
        );
        assert_eq!(
            strategy
                .verify(&Some("Bearer ".to_string()))
                .await
                .unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_bearer_strategy_rejects_token_missing_from_allow_list() {
        let (store, user) = seeded_store("password123!A").await;
        let allow_list = Arc::new(InMemoryTokenAllowList::new());
        let strategy = BearerStrategy::new(store, allow_list, SECRET, 30);

        // Signature is fine, but the token was never recorded.
        let token = jwt::sign_token(SECRET, &user).unwrap();
        let result = strategy.verify(&Some(format!("Bearer {token}"))).await;
        assert_eq!(result.unwrap_err(), AuthError::Unauthorized);
    }

    #[tokio::test]
    async fn test_bearer_strategy_rejects_revoked_token() {
        let (store, user) = seeded_store("password123!A").await;
        let allow_list = Arc::new(InMemoryTokenAllowList::new());
        let header = issued_bearer(&allow_list, &user).await;
        let raw = header.strip_prefix("Bearer ").unwrap().to_string();

        allow_list.revoke(&raw).await.unwrap();

        let strategy = BearerStrategy::new(store, allow_list, SECRET, 30);
        let result = strategy.verify(&Some(header)).await;
        assert_eq!(result.unwrap_err(), AuthError::Unauthorized);
    }

    /// Allow-list stub whose every operation fails, standing in for an
    /// unreachable backing store.
    struct UnreachableAllowList;

    #[async_trait]
    impl TokenAllowList for UnreachableAllowList {
        async fn upsert(
            &self,
            _user_id: Uuid,
            _token: &str,
            _expires_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Database("connection refused".to_string()))
        }

        async fn lookup_active(&self, _token: &str) -> Result<Option<IssuedToken>, StoreError> {
            Err(StoreError::Database("connection refused".to_string()))
        }

        async fn touch(
            &self,
            _token: &str,
            _new_expires_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Database("connection refused".to_string()))
        }

        async fn revoke(&self, _token: &str) -> Result<(), StoreError> {
            Err(StoreError::Database("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_bearer_strategy_fails_closed_when_store_unreachable() {
        let (store, user) = seeded_store("password123!A").await;
        let token = jwt::sign_token(SECRET, &user).unwrap();

        let strategy = BearerStrategy::new(store, Arc::new(UnreachableAllowList), SECRET, 30);
        let result = strategy.verify(&Some(format!("Bearer {token}"))).await;

        assert_eq!(result.unwrap_err(), AuthError::Unauthorized);
    }
}
