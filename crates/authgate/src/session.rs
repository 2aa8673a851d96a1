// Session materialization.
//
// Database mode persists a session record keyed by a fresh random token;
// stateless mode produces an unsealed claims object the host seals into a
// signed cookie. The engine never performs the sealing itself.

use chrono::{TimeDelta, Utc};

use authgate_core::adapter::Adapter;
use authgate_core::error::Result;
use authgate_core::models::{Session, User};
use authgate_core::options::SessionMode;

use crate::crypto::random::generate_session_token;

/// Unsealed claims for a stateless session.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionClaims {
    /// The user id.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl SessionClaims {
    pub fn for_user(user: &User) -> Self {
        Self {
            sub: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            picture: user.image.clone(),
        }
    }

    /// Reconstruct the session user from decoded claims.
    pub fn to_user(&self) -> User {
        User {
            id: self.sub.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            email_verified: None,
            image: self.picture.clone(),
        }
    }
}

/// The session produced by a resolution: a persisted record or claims for
/// the host's signer.
#[derive(Debug, Clone)]
pub enum SessionHandle {
    Database(Session),
    Claims(SessionClaims),
}

impl SessionHandle {
    /// The user id this session is bound to.
    pub fn user_id(&self) -> &str {
        match self {
            Self::Database(session) => &session.user_id,
            Self::Claims(claims) => &claims.sub,
        }
    }

    pub fn as_database(&self) -> Option<&Session> {
        match self {
            Self::Database(session) => Some(session),
            Self::Claims(_) => None,
        }
    }

    pub fn as_claims(&self) -> Option<&SessionClaims> {
        match self {
            Self::Database(_) => None,
            Self::Claims(claims) => Some(claims),
        }
    }
}

/// Materialize a fresh session for a resolved user.
pub(crate) async fn materialize(
    adapter: &dyn Adapter,
    mode: SessionMode,
    max_age_seconds: i64,
    user: &User,
) -> Result<SessionHandle> {
    match mode {
        SessionMode::Stateless => Ok(SessionHandle::Claims(SessionClaims::for_user(user))),
        SessionMode::Database => {
            let session = adapter
                .create_session(Session {
                    session_token: generate_session_token(),
                    user_id: user.id.clone(),
                    expires: Utc::now() + TimeDelta::seconds(max_age_seconds),
                })
                .await?;
            Ok(SessionHandle::Database(session))
        }
    }
}
