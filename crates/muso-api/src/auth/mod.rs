//! Authentication and authorization module
//!
//! The core of the platform's security model:
//! - Token signing and verification (stateless, HMAC)
//! - Password hashing with Argon2
//! - The token allow-list: server-side revocation and sliding expiry layered
//!   on top of the stateless tokens
//! - Authentication strategies (password login, bearer token)
//! - The authorization gate and its axum middleware
//! - The service tying login/logout/registration together

pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod strategy;

pub use gate::authorize;
pub use jwt::{sign_token, verify_token, Claims, JwtError};
pub use middleware::{require_auth, require_roles, AuthenticatedUser};
pub use models::{IssuedToken, LoginCredentials, User, UserPublic};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use repository::{
    InMemoryTokenAllowList, InMemoryUserStore, PgTokenAllowList, PgUserStore, StoreError,
    TokenAllowList, UserStore,
};
pub use service::{AuthService, LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
pub use strategy::{AuthError, AuthenticationStrategy, BearerStrategy, PasswordStrategy};
