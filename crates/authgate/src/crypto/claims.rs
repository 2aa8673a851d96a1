// Sealing and unsealing of stateless claims tokens.
//
// HS256 via `jsonwebtoken`. Unsealing an invalid or expired token yields
// `None`; the caller treats that as "no session", never as a fault.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use authgate_core::error::{AuthError, Result};

use crate::session::SessionClaims;

#[derive(Debug, Serialize, Deserialize)]
struct SealedClaims {
    #[serde(flatten)]
    claims: SessionClaims,
    iat: u64,
    exp: u64,
}

/// Sign session claims into a compact token.
pub fn seal_claims(claims: &SessionClaims, secret: &str, max_age_seconds: i64) -> Result<String> {
    let now = chrono::Utc::now().timestamp() as u64;
    let sealed = SealedClaims {
        claims: claims.clone(),
        iat: now,
        exp: now + max_age_seconds.max(0) as u64,
    };

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());
    jsonwebtoken::encode(&header, &sealed, &key)
        .map_err(|e| AuthError::Configuration(format!("claims signing failed: {e}")))
}

/// Verify and decode a claims token. Returns `None` on any failure:
/// bad signature, malformed token, or past expiry.
pub fn unseal_claims(token: &str, secret: &str) -> Option<SessionClaims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<SealedClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims.claims)
}
