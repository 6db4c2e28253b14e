// Authentication module - bearer credential extraction and JWT claim decoding

use http::header::AUTHORIZATION;
use http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Claims the identity chain reads; anything else lands in `custom`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub iss: Option<String>,
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

/// Returns the credential carried by `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively. Other schemes and empty
/// credentials count as absent.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, credential) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let credential = credential.trim();
    (!credential.is_empty()).then(|| credential.to_string())
}

/// Validates an HMAC-signed token and returns its claims.
///
/// `exp` is enforced when present; tokens without it are accepted.
/// Audience is not checked.
pub fn validate_jwt(
    token: &str,
    secret: &str,
    algorithm: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::from_str(algorithm)?);
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}
