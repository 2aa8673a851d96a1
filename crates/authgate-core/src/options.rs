// Configuration surface for the framework.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::AccountKind;

/// How sessions are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Sessions persist in the store; the cookie carries an opaque token.
    Database,
    /// No session records; the cookie carries a signed claims token.
    Stateless,
}

impl Default for SessionMode {
    fn default() -> Self {
        Self::Database
    }
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    #[serde(default)]
    pub mode: SessionMode,
    /// Session lifetime in seconds (default: 30 days).
    #[serde(default = "default_max_age")]
    pub max_age_seconds: i64,
}

fn default_max_age() -> i64 {
    60 * 60 * 24 * 30
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            max_age_seconds: default_max_age(),
        }
    }
}

/// Per-provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOptions {
    pub id: String,
    pub kind: AccountKind,
    /// Opt-in: adopt an existing user whose email matches an unlinked OAuth
    /// profile. Insecure against spoofed provider emails, so it is off
    /// unless a deployment explicitly enables it for a provider it trusts.
    #[serde(default)]
    pub allow_dangerous_email_account_linking: bool,
}

impl ProviderOptions {
    pub fn new(id: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: id.into(),
            kind,
            allow_dangerous_email_account_linking: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOptions {
    /// Secret for signing claims tokens and salting verification hashes.
    pub secret: String,
    #[serde(default)]
    pub session: SessionOptions,
    /// Provider configurations, keyed by provider id.
    #[serde(default)]
    pub providers: HashMap<String, ProviderOptions>,
}

impl AuthOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            session: SessionOptions::default(),
            providers: HashMap::new(),
        }
    }

    pub fn with_session_mode(mut self, mode: SessionMode) -> Self {
        self.session.mode = mode;
        self
    }

    pub fn with_provider(mut self, provider: ProviderOptions) -> Self {
        self.providers.insert(provider.id.clone(), provider);
        self
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderOptions> {
        self.providers.get(id)
    }

    /// Whether email-based auto-linking is enabled for a provider.
    /// Unconfigured providers get the safe default: disabled.
    pub fn allows_dangerous_email_linking(&self, provider: &str) -> bool {
        self.providers
            .get(provider)
            .map(|p| p.allow_dangerous_email_account_linking)
            .unwrap_or(false)
    }
}
