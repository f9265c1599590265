use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::error::AuthError;

/// Claims carried in a bearer token payload. Every field is optional: the
/// inspector reads what is present and ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
}

/// Decode bearer token claims without validation.
///
/// The client never holds the signing key; the token came from the auth
/// service over the login response and is only inspected for its expiry and
/// subject. Signature verification stays a server concern.
pub fn decode_claims(token: &str) -> Result<TokenClaims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(AuthError::TokenMalformed(
            "expected three dot-separated segments".to_string(),
        ));
    }

    // Decode the payload (second part)
    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| AuthError::TokenMalformed(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| AuthError::TokenMalformed(format!("payload is not a claims object: {}", e)))
}

/// `exp` is unix seconds. A token without `exp` never counts as expired.
pub fn is_expired(claims: &TokenClaims, now: i64) -> bool {
    match claims.exp {
        Some(exp) => exp < now,
        None => false,
    }
}
