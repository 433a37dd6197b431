use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use toogether_graph::ports::TokenIssuer;
use toogether_shared::errors::{AppError, AppResult};
use toogether_shared::types::auth::{AccessGrant, Claims};

pub fn create_access_token(profile_id: Uuid, secret: &str, ttl_secs: i64) -> Result<String, AppError> {
    let claims = Claims::new(profile_id, ttl_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

/// Issues HS256 access tokens with the configured secret and lifetime.
#[derive(Debug, Clone)]
pub struct JwtIssuer {
    secret: String,
    ttl_secs: i64,
}

impl JwtIssuer {
    pub fn new(secret: impl Into<String>, ttl_secs: i64) -> Self {
        Self { secret: secret.into(), ttl_secs }
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, profile_id: Uuid) -> AppResult<AccessGrant> {
        let token = create_access_token(profile_id, &self.secret, self.ttl_secs)?;
        Ok(AccessGrant::new(profile_id, token, self.ttl_secs))
    }
}
