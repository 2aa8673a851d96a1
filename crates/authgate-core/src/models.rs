// Data model for the sign-in framework.
//
// User is the root entity; Account and Session hold a foreign reference to
// it. VerificationToken is independent, keyed by (identifier, token).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record. Created on first successful sign-in, never auto-deleted
/// by the resolution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque, store-assigned identifier.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Required for email sign-in and email-based account linking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `None` means the email has not been verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Fields for creating a user; the store assigns the id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// The kind of external-identity binding an account represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    OAuth,
    Oidc,
    Email,
    Credentials,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth => "oauth",
            Self::Oidc => "oidc",
            Self::Email => "email",
            Self::Credentials => "credentials",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oauth" => Ok(Self::OAuth),
            "oidc" => Ok(Self::Oidc),
            "email" => Ok(Self::Email),
            "credentials" => Ok(Self::Credentials),
            other => Err(format!("unknown account kind: {other}")),
        }
    }
}

/// One external-identity binding. The pair (provider, provider_account_id)
/// is unique across all accounts; one account belongs to exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Provider identifier (e.g. "github").
    pub provider: String,
    /// Provider-assigned account identifier.
    pub provider_account_id: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    pub user_id: String,
    // Provider token material, opaque to the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
}

/// An account as presented by an inbound authentication attempt, before an
/// owning user has been resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDraft {
    pub provider: String,
    pub provider_account_id: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
}

impl AccountDraft {
    pub fn new(provider: impl Into<String>, provider_account_id: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
            kind,
            access_token: None,
            refresh_token: None,
            id_token: None,
            expires_at: None,
            scope: None,
            token_type: None,
            session_state: None,
        }
    }

    /// Bind this account to its resolved owner.
    pub fn into_account(self, user_id: impl Into<String>) -> Account {
        Account {
            provider: self.provider,
            provider_account_id: self.provider_account_id,
            kind: self.kind,
            user_id: user_id.into(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            id_token: self.id_token,
            expires_at: self.expires_at,
            scope: self.scope,
            token_type: self.token_type,
            session_state: self.session_state,
        }
    }
}

/// A database-backed session. Absent entirely under stateless sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque random token, unique.
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

/// A single-use verification token. The store holds the hash of the token
/// the user presents, never the raw token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationToken {
    /// Typically an email address.
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl VerificationToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires < now
    }
}

/// Normalized profile produced by the verification resolver from an
/// already-exchanged OAuth/OIDC profile, an email identifier, or an
/// upstream credentials check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<DateTime<Utc>>,
}

impl Profile {
    /// Draft a new user from this profile.
    pub fn to_user_draft(&self) -> UserDraft {
        UserDraft {
            name: self.name.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            image: self.image.clone(),
        }
    }
}
