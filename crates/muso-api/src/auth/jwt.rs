//! Bearer token signing and verification
//!
//! Tokens are HMAC-SHA256 signed JWTs over a minimal claim set: user id,
//! login email and role. Expiration is intentionally NOT a claim - the
//! allow-list is the single source of truth for token validity windows, so
//! the signed payload carries identity only. Claims are integrity-protected,
//! not encrypted.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::User;
use muso_core::UserRole;

/// Claims embedded in a signed bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: Uuid,
    /// Login email at issuance time (informational; role and profile are
    /// re-resolved from the store on every request)
    pub email: String,
    /// Role at issuance time
    pub role: UserRole,
}

/// Token signing and verification errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// Sign a bearer token for an authenticated user.
pub fn sign_token(secret: &str, user: &User) -> Result<String, JwtError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(JwtError::EncodingError)
}

/// Verify a bearer token's signature and extract its claims.
///
/// Verification is exact: any byte of the payload or signature differing
/// from what the secret produced fails deterministically. Expiry is not
/// checked here - that is the allow-list's job.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // The claim set has no `exp`; validity windows live in the allow-list.
    validation.required_spec_claims = std::collections::HashSet::new();
    validation.validate_exp = false;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;
    use proptest::prelude::*;

    const SECRET: &str = "test-session-secret";

    fn sample_user() -> User {
        User::new(
            "player@example.com".to_string(),
            "$argon2id$stub".to_string(),
            Some("Nina".to_string()),
            Some("Simone".to_string()),
            UserRole::User,
        )
    }

    #[test]
    fn test_sign_and_verify_token() {
        let user = sample_user();
        let token = sign_token(SECRET, &user).expect("Failed to sign token");

        let claims = verify_token(SECRET, &token).expect("Failed to verify token");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, UserRole::User);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let result = verify_token(SECRET, "not.a.token");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let user = sample_user();
        let token = sign_token(SECRET, &user).unwrap();

        let result = verify_token("another-secret", &token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_no_expiry_claim_required() {
        // A token signed today must still verify far in the future as far as
        // the signature layer is concerned; revocation is the allow-list's
        // concern.
        let user = sample_user();
        let token = sign_token(SECRET, &user).unwrap();
        assert!(verify_token(SECRET, &token).is_ok());
    }

    proptest! {
        /// Flipping any single byte of a valid token must fail verification.
        #[test]
        fn tampered_token_never_verifies(index in 0usize..200, bit in 0u8..8) {
            let user = sample_user();
            let token = sign_token(SECRET, &user).unwrap();
            let mut bytes = token.into_bytes();
            let index = index % bytes.len();
            bytes[index] ^= 1 << bit;

            if let Ok(tampered) = String::from_utf8(bytes) {
                prop_assert!(verify_token(SECRET, &tampered).is_err());
            }
        }
    }
}
