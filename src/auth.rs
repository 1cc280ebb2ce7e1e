use bcrypt::{hash, verify};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{AppUser, UserRole};

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
// Minimum bcrypt cost keeps the test suite fast
#[cfg(test)]
const HASH_COST: u32 = 4;

/// JWT claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String, // user id
    pub role: UserRole,
    pub tenants: Vec<String>,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn is_platform_admin(&self) -> bool {
        self.role == UserRole::SuperadminPlatform
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(hash(password, HASH_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    Ok(verify(password, hash)?)
}

/// Issues and validates HS256 tokens with the configured secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_secs: config.token_ttl_secs,
        }
    }

    pub fn issue(&self, user: &AppUser) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::Clock)?
            .as_secs();

        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            tenants: user.tenant_ids.iter().cloned().collect(),
            iat: now as usize,
            exp: (now + self.ttl_secs) as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data =
            decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(token_data.claims)
    }
}
