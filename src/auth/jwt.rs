use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use super::Claims;

/// Verification key for tokens issued by the identity provider.
#[derive(Clone)]
pub struct JwtKeys {
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            dec: DecodingKey::from_secret(secret),
        }
    }
}

/// Verifies signature and expiry (HS256 only).
pub fn decode_token(
    keys: &JwtKeys,
    token: &str,
    leeway_secs: u64,
) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = leeway_secs;
    decode::<Claims>(token, &keys.dec, &validation).map(|data| data.claims)
}
