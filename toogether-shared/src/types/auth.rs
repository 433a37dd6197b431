use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims. `sub` is the profile id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(profile_id: Uuid, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: profile_id,
            iat: now,
            exp: now + duration_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// The authenticated caller, extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.sub }
    }
}

/// An access credential handed out after login or code validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub profile_id: Uuid,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AccessGrant {
    pub fn new(profile_id: Uuid, access_token: String, expires_in: i64) -> Self {
        Self {
            profile_id,
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Supplies the HMAC secret used to validate bearer tokens.
pub trait TokenSecret {
    fn token_secret(&self) -> &str;
}

impl<T: TokenSecret> TokenSecret for std::sync::Arc<T> {
    fn token_secret(&self) -> &str {
        (**self).token_secret()
    }
}
