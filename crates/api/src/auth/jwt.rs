//! JWT issuance and validation.
//!
//! Single shared-secret HS256 scheme. Tokens carry the operator's id,
//! username, and role, and expire after the configured lifetime
//! (8 hours by default).

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use linkwave_shared::UserRole;

/// Claims embedded in an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Operator user id
    pub sub: Uuid,
    pub username: String,
    pub role: UserRole,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Signs and validates access tokens with a shared secret.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Issue a token for the given operator identity.
    pub fn generate_token(
        &self,
        user_id: Uuid,
        username: &str,
        role: UserRole,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            iat: now.unix_timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).unix_timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate signature and expiry, returning the decoded claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_preserves_identity() {
        let manager = JwtManager::new("test-secret", 8);
        let user_id = Uuid::new_v4();
        let token = manager
            .generate_token(user_id, "admin", UserRole::Admin)
            .unwrap();

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, UserRole::Admin);
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = JwtManager::new("secret-a", 8);
        let verifier = JwtManager::new("secret-b", 8);
        let token = issuer
            .generate_token(Uuid::new_v4(), "admin", UserRole::Admin)
            .unwrap();
        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Negative lifetime puts exp in the past.
        let manager = JwtManager::new("test-secret", -1);
        let token = manager
            .generate_token(Uuid::new_v4(), "admin", UserRole::User)
            .unwrap();
        assert!(manager.validate_token(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let manager = JwtManager::new("test-secret", 8);
        assert!(manager.validate_token("not-a-jwt").is_err());
    }
}
