//! Muso Core - shared vocabulary for the musicians' networking platform
//!
//! This crate defines the pieces every other crate agrees on:
//! - Role vocabulary for authorization decisions
//! - Configuration management (environment and TOML file loading)
//!
//! It deliberately knows nothing about HTTP or storage.

pub mod config;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};

use serde::{Deserialize, Serialize};

/// Platform role attached to every user account.
///
/// The platform keeps authorization deliberately flat: two roles, checked
/// against a per-route required set. `Admin` is not an implicit superset of
/// `User` — routes that admit both must list both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    /// Wire representation, matching the stored form.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::User => "USER",
        }
    }

    /// Every role the platform knows about, in display order.
    pub fn all() -> &'static [UserRole] {
        &[UserRole::Admin, UserRole::User]
    }
}

impl std::str::FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(UserRole::Admin),
            "USER" => Ok(UserRole::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a role string that is not part of the enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!(UserRole::Admin.as_str(), "ADMIN");
        assert_eq!(UserRole::User.as_str(), "USER");
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("USER").unwrap(), UserRole::User);
        assert!(UserRole::from_str("editor").is_err());
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");
        let parsed: UserRole = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(parsed, UserRole::User);
    }

    #[test]
    fn all_lists_both_roles() {
        assert_eq!(UserRole::all().len(), 2);
    }
}
