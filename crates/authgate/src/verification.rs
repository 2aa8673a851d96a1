// Verification token resolution for email sign-in.
//
// The store holds base64url(SHA-256(token ‖ secret)), never the raw token.
// Consuming a token is an atomic find-and-delete at the adapter, so a
// presented token cannot be replayed even when it turns out to be expired.

use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};

use authgate_core::adapter::Adapter;
use authgate_core::error::{AuthError, Result};
use authgate_core::models::VerificationToken;

/// Hash a presented token with the server secret for store comparison.
pub fn hash_token(token: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(secret.as_bytes());
    base64_url_encode(&hasher.finalize())
}

/// Base64url encode without padding.
fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// Store a new verification token for `identifier`, hashed at rest.
/// Returns the raw token's stored record (hashed form).
pub async fn issue_verification_token(
    adapter: &dyn Adapter,
    identifier: &str,
    raw_token: &str,
    secret: &str,
    ttl: TimeDelta,
) -> Result<VerificationToken> {
    adapter
        .create_verification_token(VerificationToken {
            identifier: identifier.to_string(),
            token: hash_token(raw_token, secret),
            expires: Utc::now() + ttl,
        })
        .await
}

/// Validate and consume a presented verification token.
///
/// Fails with [`AuthError::Verification`]: `has_invite` is false when no
/// matching token exists (never issued, or already used), true when one
/// existed; `expired` marks a consumed-but-stale token. Both are rejected.
pub async fn consume_verification_token(
    adapter: &dyn Adapter,
    identifier: &str,
    raw_token: &str,
    secret: &str,
) -> Result<VerificationToken> {
    consume_verification_token_at(adapter, identifier, raw_token, secret, Utc::now()).await
}

/// As [`consume_verification_token`], with an explicit clock for tests.
pub async fn consume_verification_token_at(
    adapter: &dyn Adapter,
    identifier: &str,
    raw_token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<VerificationToken> {
    let hashed = hash_token(raw_token, secret);

    // The lookup deletes the record whether or not it is expired.
    let invite = adapter.use_verification_token(identifier, &hashed).await?;

    match invite {
        None => Err(AuthError::Verification {
            has_invite: false,
            expired: false,
        }),
        Some(token) if token.is_expired(now) => Err(AuthError::Verification {
            has_invite: true,
            expired: true,
        }),
        Some(token) => Ok(token),
    }
}
