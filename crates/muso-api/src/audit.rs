//! Security audit logging for authentication events
//!
//! Structured records for every authentication-related decision: logins,
//! logouts, registrations, rejected tokens and denied authorizations.
//! Events are logged at INFO with the `audit` target so they can be filtered
//! and routed to security monitoring separately from application logs.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful login
    LoginSuccess { user_id: Uuid, identifier: String },

    /// Failed login attempt
    LoginFailure { identifier: String, reason: String },

    /// User logout (best-effort revocation included)
    Logout { user_id: Uuid, email: String },

    /// New account registered
    RegistrationSuccess { user_id: Uuid, email: String },

    /// Bearer token rejected (missing, malformed, bad signature, off the
    /// allow-list or expired)
    InvalidToken { reason: String },

    /// Identity resolved but the required role set did not admit it
    AccessDenied {
        user_id: Option<Uuid>,
        email: Option<String>,
        required_roles: Vec<String>,
    },
}

/// Log a security audit event with structured fields.
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess {
            user_id,
            identifier,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                identifier = %identifier,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure { identifier, reason } => {
            info!(
                target: "audit",
                event = %event_json,
                identifier = %identifier,
                reason = %reason,
                "Login failed"
            );
        }
        AuditEvent::Logout { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "User logout"
            );
        }
        AuditEvent::RegistrationSuccess { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "User registered"
            );
        }
        AuditEvent::InvalidToken { reason } => {
            info!(
                target: "audit",
                event = %event_json,
                reason = %reason,
                "Invalid token"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            email,
            required_roles,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = ?user_id,
                email = ?email,
                required_roles = ?required_roles,
                "Access denied"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_tag() {
        let event = AuditEvent::LoginFailure {
            identifier: "user@example.com".to_string(),
            reason: "Incorrect username or password".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "login_failure");
        assert_eq!(json["identifier"], "user@example.com");
    }

    #[test]
    fn test_access_denied_carries_required_roles() {
        let event = AuditEvent::AccessDenied {
            user_id: Some(Uuid::new_v4()),
            email: Some("user@example.com".to_string()),
            required_roles: vec!["ADMIN".to_string()],
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "access_denied");
        assert_eq!(json["required_roles"][0], "ADMIN");
    }
}
