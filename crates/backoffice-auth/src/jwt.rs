//! JWT (JSON Web Token) handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default token lifetime
pub const DEFAULT_TOKEN_HOURS: i64 = 24;

/// JWT claims for back-office sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwtClaims {
    /// Subject (user ID as string)
    pub sub: String,
    /// Numeric user ID
    pub user_id: i32,
    pub username: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl JwtClaims {
    pub fn new(user_id: i32, username: String, issuer: String, validity: Duration) -> Self {
        let now = Utc::now();
        let exp = now + validity;

        Self {
            sub: user_id.to_string(),
            user_id,
            username,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: issuer,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Seconds left before expiry, zero once expired
    pub fn expires_in(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    TokenExpired,
}

/// JWT validator
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Create a new JWT validator using HMAC-SHA256 (symmetric secret)
    ///
    /// Validates the signature and expiration only.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        // Leeway would let just-expired tokens through
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, JwtError> {
        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)?;

        if token_data.claims.is_expired() {
            return Err(JwtError::TokenExpired);
        }

        Ok(token_data.claims)
    }

    /// Encode JWT using HMAC-SHA256 (symmetric secret)
    pub fn encode(secret: &[u8], claims: &JwtClaims) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(secret);

        Ok(encode(&header, claims, &encoding_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test_secret_key_1234567890";

    #[test]
    fn test_jwt_encode_decode() {
        let claims = JwtClaims::new(
            7,
            "admin".to_string(),
            "backoffice".to_string(),
            Duration::hours(1),
        );

        let token = JwtValidator::encode(TEST_SECRET, &claims).unwrap();

        let validator = JwtValidator::new(TEST_SECRET).with_issuer("backoffice".to_string());
        let decoded = validator.validate(&token).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.sub, "7");
    }

    #[test]
    fn test_expired_token() {
        let claims = JwtClaims::new(
            1,
            "admin".to_string(),
            "backoffice".to_string(),
            Duration::seconds(-10), // Already expired
        );

        assert!(claims.is_expired());
        assert_eq!(claims.expires_in(), 0);

        let token = JwtValidator::encode(TEST_SECRET, &claims).unwrap();
        let result = JwtValidator::new(TEST_SECRET).validate(&token);

        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = JwtClaims::new(
            1,
            "admin".to_string(),
            "backoffice".to_string(),
            Duration::hours(1),
        );
        let token = JwtValidator::encode(b"other-secret", &claims).unwrap();

        assert!(JwtValidator::new(TEST_SECRET).validate(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let claims = JwtClaims::new(
            1,
            "admin".to_string(),
            "someone-else".to_string(),
            Duration::hours(1),
        );
        let token = JwtValidator::encode(TEST_SECRET, &claims).unwrap();

        let validator = JwtValidator::new(TEST_SECRET).with_issuer("backoffice".to_string());
        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(JwtValidator::new(TEST_SECRET).validate("not.a.jwt").is_err());
    }
}
