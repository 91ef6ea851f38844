//! Authentication service layer
//!
//! Business logic for login, logout, registration and the user queries the
//! auth endpoints expose. The service owns nothing global: stores, signing
//! secret and the sliding window are injected at construction.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use muso_core::UserRole;

use super::jwt::sign_token;
use super::models::{LoginCredentials, User, UserPublic};
use super::password::{hash_password, validate_password_strength};
use super::repository::{TokenAllowList, UserStore};
use super::strategy::{AuthError, AuthenticationStrategy, PasswordStrategy};
use crate::audit::{audit_log, AuditEvent};
use crate::error::AppError;

/// User login request.
///
/// `username` accepts either of the configured login identifiers (email or
/// phone number).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 9, message = "should NOT be shorter than 9 characters"))]
    pub username: String,
    #[validate(length(min = 10, message = "should NOT be shorter than 10 characters"))]
    pub password: String,
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email, length(min = 9, max = 255))]
    pub email: String,
    #[validate(length(min = 10, message = "should NOT be shorter than 10 characters"))]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
}

/// Successful login response: public profile fields plus the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserPublic,
    /// Full header value, `Bearer ` scheme included
    pub token: String,
}

/// Plain message response (logout, registration)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    allow_list: Arc<dyn TokenAllowList>,
    session_secret: String,
    access_token_expires_mins: i64,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        allow_list: Arc<dyn TokenAllowList>,
        session_secret: impl Into<String>,
        access_token_expires_mins: i64,
    ) -> Self {
        Self {
            users,
            allow_list,
            session_secret: session_secret.into(),
            access_token_expires_mins,
        }
    }

    fn expiry_from_now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::minutes(self.access_token_expires_mins)
    }

    /// Login with an identifier/password pair.
    ///
    /// On success the freshly signed token is recorded on the allow-list
    /// before it is handed out: a token that cannot be tracked (and hence
    /// cannot be revoked later) must not reach the client, so an allow-list
    /// write failure fails the whole login.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        let credentials = LoginCredentials {
            identifier: request.username,
            password: request.password,
        };

        let strategy = PasswordStrategy::new(Arc::clone(&self.users));
        let user = match strategy.verify(&credentials).await {
            Ok(user) => user,
            Err(err) => {
                audit_log(&AuditEvent::LoginFailure {
                    identifier: credentials.identifier.clone(),
                    reason: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let token = sign_token(&self.session_secret, &user)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))?;

        if let Err(err) = self
            .allow_list
            .upsert(user.id, &token, self.expiry_from_now())
            .await
        {
            tracing::error!(error = %err, user_id = %user.id, "allow-list write failed at login");
            return Err(AuthError::TokenPersistence.into());
        }

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            identifier: credentials.identifier,
        });

        Ok(LoginResponse {
            user: user.to_public(),
            token: format!("Bearer {token}"),
        })
    }

    /// Logout: revoke the allow-list entry for the presented token.
    ///
    /// Revocation is best-effort. If the store write fails the token simply
    /// stays valid until its natural expiry; the client still gets a success
    /// message because there is nothing it could do about the failure.
    pub async fn logout(&self, user_id: Uuid, email: &str, token: &str) -> MessageResponse {
        if let Err(err) = self.allow_list.revoke(token).await {
            tracing::warn!(error = %err, user_id = %user_id, "token revocation failed at logout");
        }

        audit_log(&AuditEvent::Logout {
            user_id,
            email: email.to_string(),
        });

        MessageResponse {
            message: "Success! You are logged out".to_string(),
        }
    }

    /// Register a new user account with the default `USER` role.
    pub async fn register(&self, request: RegisterRequest) -> Result<MessageResponse, AppError> {
        validate_password_strength(&request.password).map_err(AppError::BadRequest)?;

        let email = request.email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::EmailAlreadyUsed);
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;

        let mut user = User::new(
            email.clone(),
            password_hash,
            request.first_name,
            request.last_name,
            UserRole::User,
        );
        user.phone_number = request.phone_number;
        user.instrument = request.instrument;

        let user = self.users.insert(user).await?;

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: user.id,
            email: user.email.clone(),
        });

        Ok(MessageResponse {
            message: format!("Success! User with {email} was created"),
        })
    }

    /// Fetch one user's public profile.
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserPublic, AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        Ok(user.to_public())
    }

    /// List all users (public projection).
    pub async fn list_users(&self) -> Result<Vec<UserPublic>, AppError> {
        let users = self.users.list().await?;
        Ok(users.iter().map(User::to_public).collect())
    }

    /// The role vocabulary, for the admin-facing roles endpoint.
    pub fn roles(&self) -> Vec<&'static str> {
        UserRole::all().iter().map(UserRole::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::{InMemoryTokenAllowList, InMemoryUserStore};

    const SECRET: &str = "service-test-secret";

    fn service_with_stores() -> (AuthService, Arc<InMemoryUserStore>, Arc<InMemoryTokenAllowList>)
    {
        let users = Arc::new(InMemoryUserStore::new());
        let allow_list = Arc::new(InMemoryTokenAllowList::new());
        let service = AuthService::new(
            Arc::clone(&users) as Arc<dyn UserStore>,
            Arc::clone(&allow_list) as Arc<dyn TokenAllowList>,
            SECRET,
            30,
        );
        (service, users, allow_list)
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, _, allow_list) = service_with_stores();

        let created = service
            .register(RegisterRequest {
                email: "Trumpet@Example.com".to_string(),
                password: "password123!A".to_string(),
                phone_number: None,
                first_name: Some("Clora".to_string()),
                last_name: Some("Bryant".to_string()),
                instrument: Some("trumpet".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(
            created.message,
            "Success! User with trumpet@example.com was created"
        );

        let response = service
            .login(LoginRequest {
                username: "trumpet@example.com".to_string(),
                password: "password123!A".to_string(),
            })
            .await
            .unwrap();

        assert!(response.token.starts_with("Bearer "));
        assert_eq!(response.user.email, "trumpet@example.com");

        // The issued token is on the allow-list without its scheme prefix.
        let raw = response.token.strip_prefix("Bearer ").unwrap();
        assert!(allow_list.lookup_active(raw).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let (service, _, _) = service_with_stores();
        let request = RegisterRequest {
            email: "dup@example.com".to_string(),
            password: "password123!A".to_string(),
            phone_number: None,
            first_name: None,
            last_name: None,
            instrument: None,
        };

        service.register(request.clone()).await.unwrap();
        let second = service.register(request).await;
        assert!(matches!(second, Err(AppError::EmailAlreadyUsed)));
    }

    #[tokio::test]
    async fn test_weak_password_rejected_at_registration() {
        let (service, _, _) = service_with_stores();
        let result = service
            .register(RegisterRequest {
                email: "weak@example.com".to_string(),
                password: "alllowercase1!".to_string(),
                phone_number: None,
                first_name: None,
                last_name: None,
                instrument: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_second_login_replaces_first_token() {
        let (service, _, allow_list) = service_with_stores();
        service
            .register(RegisterRequest {
                email: "solo@example.com".to_string(),
                password: "password123!A".to_string(),
                phone_number: None,
                first_name: None,
                last_name: None,
                instrument: None,
            })
            .await
            .unwrap();

        let login = |username: &str| {
            let service = service.clone();
            let username = username.to_string();
            async move {
                service
                    .login(LoginRequest {
                        username,
                        password: "password123!A".to_string(),
                    })
                    .await
                    .unwrap()
            }
        };

        let first = login("solo@example.com").await;
        let second = login("solo@example.com").await;

        let first_raw = first.token.strip_prefix("Bearer ").unwrap();
        let second_raw = second.token.strip_prefix("Bearer ").unwrap();

        assert!(allow_list.lookup_active(first_raw).await.unwrap().is_none());
        assert!(allow_list
            .lookup_active(second_raw)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_logout_reports_success_and_revokes() {
        let (service, _, allow_list) = service_with_stores();
        service
            .register(RegisterRequest {
                email: "leave@example.com".to_string(),
                password: "password123!A".to_string(),
                phone_number: None,
                first_name: None,
                last_name: None,
                instrument: None,
            })
            .await
            .unwrap();

        let login = service
            .login(LoginRequest {
                username: "leave@example.com".to_string(),
                password: "password123!A".to_string(),
            })
            .await
            .unwrap();

        let raw = login.token.strip_prefix("Bearer ").unwrap();
        let response = service
            .logout(login.user.user_id, &login.user.email, raw)
            .await;

        assert_eq!(response.message, "Success! You are logged out");
        assert!(allow_list.lookup_active(raw).await.unwrap().is_none());

        // Logging out twice is fine.
        let again = service
            .logout(login.user.user_id, &login.user.email, raw)
            .await;
        assert_eq!(again.message, "Success! You are logged out");
    }

    #[tokio::test]
    async fn test_roles_listing() {
        let (service, _, _) = service_with_stores();
        assert_eq!(service.roles(), vec!["ADMIN", "USER"]);
    }
}
