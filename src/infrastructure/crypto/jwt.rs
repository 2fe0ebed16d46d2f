//! JWT Token handling
//!
//! Tokens are issued by the identity service; this side only verifies
//! them and turns the claims into a [`Principal`].

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult, Principal};

/// JWT configuration (`[security]` in the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Secret key shared with the token issuer
    pub jwt_secret: String,
    /// Expected issuer claim
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "super-secret-key-change-in-production".to_string(),
            issuer: "field-booking".to_string(),
        }
    }
}

/// JWT TokenClaims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (numeric user ID)
    pub sub: String,
    /// `admin` or `user`
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl TokenClaims {
    pub fn new(user_id: i64, role: &str, ttl: Duration, config: &JwtConfig) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }

    /// Check if the user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }

    pub fn principal(&self) -> DomainResult<Principal> {
        let user_id: i64 = self
            .sub
            .parse()
            .map_err(|_| DomainError::Unauthorized("Invalid subject claim".to_string()))?;
        Ok(if self.is_admin() {
            Principal::admin(user_id)
        } else {
            Principal::user(user_id)
        })
    }
}

/// Sign claims into a token. Used by tests and local tooling.
pub fn create_token(
    user_id: i64,
    role: &str,
    ttl: Duration,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        &TokenClaims::new(user_id, role, ttl, config),
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Verify and decode a JWT token
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}
