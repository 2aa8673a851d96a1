// Callback orchestration.
//
// Thin layer between the host framework and the resolution engine: runs
// provider-kind pre-processing (consuming the one-time token for email
// sign-in), invokes the engine, and translates its decision into redirect
// and cookie primitives. Policy rejections become error redirects with
// fixed, non-enumerable codes; store failures propagate to the host.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use authgate_core::error::{AuthError, Result};
use authgate_core::models::{AccountDraft, AccountKind, Profile};
use authgate_core::options::SessionMode;

use crate::crypto::claims::seal_claims;
use crate::engine::ResolutionEngine;
use crate::session::SessionHandle;
use crate::verification::consume_verification_token;

/// An inbound, already-verified authentication callback.
///
/// For OAuth/OIDC the token exchange happened upstream; for email sign-in
/// `presented_token` carries the raw one-time token still to be consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    pub session_token: Option<String>,
    pub profile: Profile,
    pub account: AccountDraft,
    #[serde(default)]
    pub presented_token: Option<String>,
    pub callback_url: String,
    pub error_url: String,
}

/// Cookie material for the host to set on the response.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCookie {
    /// Opaque session token (database sessions) or sealed claims token
    /// (stateless sessions).
    pub value: String,
    pub expires: DateTime<Utc>,
}

/// The orchestrator's decision, expressed as HTTP response primitives.
#[derive(Debug, Clone)]
pub enum CallbackResult {
    /// Redirect with the session cookie set.
    Redirect {
        url: String,
        cookie: SessionCookie,
        is_new_user: bool,
    },
    /// Redirect to the error page with a generic error code.
    ErrorRedirect { url: String },
}

impl CallbackResult {
    pub fn url(&self) -> &str {
        match self {
            Self::Redirect { url, .. } | Self::ErrorRedirect { url } => url,
        }
    }
}

/// Fixed error codes placed on the error URL. Deliberately generic: the
/// conflicting email or account is never revealed.
fn error_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::AccountNotLinked { .. } => "AccountNotLinked",
        AuthError::Verification { expired: true, .. } => "VerificationExpired",
        AuthError::Verification { .. } => "Verification",
        AuthError::Configuration(_) => "Configuration",
        _ => "Internal",
    }
}

fn build_error_redirect(base_url: &str, code: &str) -> String {
    let sep = if base_url.contains('?') { "&" } else { "?" };
    format!("{base_url}{sep}error={code}")
}

/// Handle an inbound callback end to end.
///
/// Policy and verification failures become `Ok(ErrorRedirect)`; store I/O
/// and constraint failures are returned as `Err` for the host to surface.
pub async fn handle_callback(
    engine: &ResolutionEngine,
    request: CallbackRequest,
) -> Result<CallbackResult> {
    // Email sign-in: consume the one-time token before resolving.
    if request.account.kind == AccountKind::Email {
        let adapter = engine.adapter().ok_or_else(|| {
            AuthError::Configuration("email sign-in requires a configured store".into())
        })?;
        let identifier = request.profile.email.as_deref().unwrap_or_default();
        let presented = request.presented_token.as_deref().unwrap_or_default();

        if let Err(err) = consume_verification_token(
            adapter,
            identifier,
            presented,
            &engine.options().secret,
        )
        .await
        {
            return match err {
                AuthError::Verification { .. } => Ok(CallbackResult::ErrorRedirect {
                    url: build_error_redirect(&request.error_url, error_code(&err)),
                }),
                other => Err(other),
            };
        }
    }

    let resolution = match engine
        .resolve(
            request.session_token.as_deref(),
            &request.profile,
            &request.account,
        )
        .await
    {
        Ok(resolution) => resolution,
        Err(err @ AuthError::AccountNotLinked { .. })
        | Err(err @ AuthError::Configuration(_)) => {
            return Ok(CallbackResult::ErrorRedirect {
                url: build_error_redirect(&request.error_url, error_code(&err)),
            });
        }
        Err(other) => return Err(other),
    };

    let max_age = engine.options().session.max_age_seconds;
    let cookie = match &resolution.session {
        SessionHandle::Database(session) => SessionCookie {
            value: session.session_token.clone(),
            expires: session.expires,
        },
        SessionHandle::Claims(claims) => SessionCookie {
            value: seal_claims(claims, &engine.options().secret, max_age)?,
            expires: Utc::now() + TimeDelta::seconds(max_age),
        },
    };

    Ok(CallbackResult::Redirect {
        url: request.callback_url,
        cookie,
        is_new_user: resolution.is_new_user,
    })
}

/// Whether a callback request is shaped for the engine at all. The host
/// can reject malformed requests before any store I/O.
pub fn validate_request(request: &CallbackRequest) -> Result<()> {
    if request.account.provider.is_empty() || request.account.provider_account_id.is_empty() {
        return Err(AuthError::Configuration(
            "account must carry a provider and a provider account id".into(),
        ));
    }
    if request.account.kind == AccountKind::Email
        && request.profile.email.as_deref().unwrap_or_default().is_empty()
    {
        return Err(AuthError::Configuration(
            "email sign-in requires a profile email".into(),
        ));
    }
    Ok(())
}
