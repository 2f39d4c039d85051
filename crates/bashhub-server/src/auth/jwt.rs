//! JWT token issuance and validation.

use bashhub_core::db::unix_timestamp;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use super::claims::Claims;

/// Token lifetime: 10 000 hours.
pub const TOKEN_TTL_SECS: i64 = 10_000 * 60 * 60;

/// Manages JWT token creation and validation.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given secret.
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    /// Issue an access token for `username` on `system_name`.
    pub fn issue(
        &self,
        username: &str,
        system_name: &str,
        user_id: u64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = unix_timestamp();
        let claims = Claims {
            username: username.to_string(),
            system_name: system_name.to_string(),
            user_id,
            exp: now + self.ttl_secs,
            orig_iat: now,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a token's signature and expiry and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}
