// Error taxonomy.
//
// Every failure is a typed variant distinguishable by kind; a security
// rejection is never conflated with "not found" or "not signed in".

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an account-linking attempt was rejected.
///
/// A closed enum so callers can map rejections to generic, non-enumerable
/// error codes without inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkRejection {
    /// The account is already bound to a different user while another user
    /// is signed in.
    AccountAlreadyLinked,
    /// A user with the same email already exists and email-based
    /// auto-linking is not enabled for the provider.
    EmailAlreadyInUse,
}

impl fmt::Display for LinkRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::AccountAlreadyLinked => "already associated with another user",
            Self::EmailAlreadyInUse => "another account already exists with the same e-mail address",
        };
        write!(f, "{msg}")
    }
}

/// Unified error type for the framework.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Caller/integration bug. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Security policy rejection of a linking attempt. Not a system fault.
    #[error("account not linked ({provider}): {reason}")]
    AccountNotLinked {
        provider: String,
        reason: LinkRejection,
    },

    /// A verification token was rejected. `has_invite` distinguishes
    /// "existed but expired" from "never existed / already used"; both are
    /// rejected identically.
    #[error("verification token rejected (invite: {has_invite}, expired: {expired})")]
    Verification { has_invite: bool, expired: bool },

    /// Store I/O failure. Propagated unchanged; the engine never retries.
    #[error("store error: {0}")]
    Store(String),

    /// Store-level constraint violation, e.g. the loser of a concurrent
    /// first-link race on (provider, providerAccountId).
    #[error("constraint violation: {0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuthError {
    /// True for failures the user can recover from by retrying the flow.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Verification { .. })
    }
}

/// Unified result type for authgate operations.
pub type Result<T> = std::result::Result<T, AuthError>;
