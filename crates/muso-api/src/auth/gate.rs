//! Authorization gate
//!
//! The final decision point before a handler runs: given whatever identity
//! the authentication strategies resolved (or failed to resolve) and the
//! route's required role set, allow the request or reject it with a specific
//! error kind.
//!
//! No IO and no HTTP here - the middleware layer feeds this function and
//! translates its verdicts into responses.

use muso_core::UserRole;

use super::middleware::AuthenticatedUser;
use super::strategy::AuthError;

/// Decide whether a request may proceed.
///
/// Rules, in order:
/// - no identity resolved at all → `Unauthorized`
/// - identity resolved but the surrounding session layer did not vouch for
///   it → `NotAuthenticated` (kept distinct so cookie-session routes and
///   bearer routes fail differently)
/// - `required` non-empty and the identity's role is not a member →
///   `NotEnoughPermissions`
/// - otherwise the identity is allowed through
///
/// An empty `required` set means "any authenticated principal".
pub fn authorize<'a>(
    identity: Option<&'a AuthenticatedUser>,
    session_valid: bool,
    required: &[UserRole],
) -> Result<&'a AuthenticatedUser, AuthError> {
    let identity = identity.ok_or(AuthError::Unauthorized)?;

    if !session_valid {
        return Err(AuthError::NotAuthenticated);
    }

    if !required.is_empty() && !required.contains(&identity.role) {
        return Err(AuthError::NotEnoughPermissions);
    }

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn identity(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "gate@example.com".to_string(),
            role,
            token: "signed-token".to_string(),
        }
    }

    #[test]
    fn test_absent_identity_is_unauthorized() {
        let result = authorize(None, true, &[]);
        assert_eq!(result.unwrap_err(), AuthError::Unauthorized);
    }

    #[test]
    fn test_invalid_session_is_not_authenticated() {
        let user = identity(UserRole::Admin);
        let result = authorize(Some(&user), false, &[]);
        assert_eq!(result.unwrap_err(), AuthError::NotAuthenticated);
    }

    #[test]
    fn test_empty_role_set_admits_any_authenticated_principal() {
        let admin = identity(UserRole::Admin);
        let user = identity(UserRole::User);

        assert!(authorize(Some(&admin), true, &[]).is_ok());
        assert!(authorize(Some(&user), true, &[]).is_ok());
    }

    #[test]
    fn test_role_membership_is_enforced() {
        let user = identity(UserRole::User);

        assert!(authorize(Some(&user), true, &[UserRole::Admin, UserRole::User]).is_ok());

        let denied = authorize(Some(&user), true, &[UserRole::Admin]);
        assert_eq!(denied.unwrap_err(), AuthError::NotEnoughPermissions);
    }

    #[test]
    fn test_admin_is_not_implicitly_a_member() {
        // Routes list every admitted role explicitly; Admin gets no wildcard.
        let admin = identity(UserRole::Admin);
        let denied = authorize(Some(&admin), true, &[UserRole::User]);
        assert_eq!(denied.unwrap_err(), AuthError::NotEnoughPermissions);
    }
}
