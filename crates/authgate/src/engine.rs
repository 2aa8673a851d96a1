// Login/link resolution.
//
// Given a normalized profile/account pair and the caller's current session,
// decide the outcome of an authentication attempt: sign in an existing
// user, create a new one, link the account to the signed-in user, reject
// the attempt, or resume the current session unchanged.
//
// Ordering invariant: the account lookup by (provider, providerAccountId)
// always runs before any email-based fallback, so an established provider
// binding can never be overridden by a spoofable profile email.

use std::sync::Arc;

use chrono::Utc;

use authgate_core::adapter::{Adapter, SessionAndUser};
use authgate_core::error::{AuthError, LinkRejection, Result};
use authgate_core::logger::AuthLogger;
use authgate_core::models::{AccountDraft, AccountKind, Profile, Session, User};
use authgate_core::options::{AuthOptions, SessionMode};

use crate::crypto::claims::unseal_claims;
use crate::session::{materialize, SessionClaims, SessionHandle};

/// The outcome of a resolved authentication attempt.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub user: User,
    pub session: SessionHandle,
    pub is_new_user: bool,
}

/// The caller's current session, if any.
struct CurrentSession {
    user: User,
    /// Present only under database sessions.
    record: Option<Session>,
}

enum Backend {
    Store(Arc<dyn Adapter>),
    /// No persistent store configured: the engine degrades to handing the
    /// profile back as the user, with stateless claims and no persistence.
    Adapterless,
}

/// The login/link resolution engine.
pub struct ResolutionEngine {
    backend: Backend,
    options: AuthOptions,
    logger: AuthLogger,
}

impl ResolutionEngine {
    pub fn new(adapter: Arc<dyn Adapter>, options: AuthOptions) -> Self {
        Self {
            backend: Backend::Store(adapter),
            options,
            logger: AuthLogger::default(),
        }
    }

    /// An engine with no backing store. Sessions are always stateless.
    pub fn adapterless(options: AuthOptions) -> Self {
        Self {
            backend: Backend::Adapterless,
            options,
            logger: AuthLogger::default(),
        }
    }

    pub fn with_logger(mut self, logger: AuthLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    /// The backing store, if one is configured.
    pub fn adapter(&self) -> Option<&dyn Adapter> {
        match &self.backend {
            Backend::Store(adapter) => Some(adapter.as_ref()),
            Backend::Adapterless => None,
        }
    }

    fn mode(&self) -> SessionMode {
        match self.backend {
            Backend::Adapterless => SessionMode::Stateless,
            Backend::Store(_) => self.options.session.mode,
        }
    }

    /// Resolve an authentication attempt.
    ///
    /// `current_session_token` is the caller's session cookie value, if one
    /// was presented: a store token under database sessions, a sealed
    /// claims token under stateless sessions. An undecodable or unknown
    /// token is treated as "no session", never as an error.
    pub async fn resolve(
        &self,
        current_session_token: Option<&str>,
        profile: &Profile,
        account: &AccountDraft,
    ) -> Result<Resolution> {
        if account.provider.is_empty() || account.provider_account_id.is_empty() {
            return Err(AuthError::Configuration(
                "account must carry a provider and a provider account id".into(),
            ));
        }

        let adapter: &dyn Adapter = match &self.backend {
            Backend::Store(adapter) => adapter.as_ref(),
            Backend::Adapterless => return self.passthrough(profile, account),
        };

        if account.kind == AccountKind::Credentials {
            // Credentials are checked upstream and nothing is persisted for
            // them; that only composes with stateless sessions.
            if self.mode() == SessionMode::Database {
                return Err(AuthError::Configuration(
                    "credentials sign-in requires stateless sessions".into(),
                ));
            }
            return self.passthrough(profile, account);
        }

        let current = self.current_session(adapter, current_session_token).await?;

        match account.kind {
            AccountKind::Email => self.resolve_email(adapter, current, profile).await,
            AccountKind::OAuth | AccountKind::Oidc => {
                self.resolve_oauth(adapter, current, profile, account).await
            }
            AccountKind::Credentials => unreachable!("handled above"),
        }
    }

    /// Step 1: resolve the caller's current session. Never mutates anything.
    async fn current_session(
        &self,
        adapter: &dyn Adapter,
        token: Option<&str>,
    ) -> Result<Option<CurrentSession>> {
        let Some(token) = token else {
            return Ok(None);
        };

        match self.mode() {
            SessionMode::Stateless => {
                // Decode failure is swallowed: the caller simply has no session.
                Ok(unseal_claims(token, &self.options.secret).map(|claims| CurrentSession {
                    user: claims.to_user(),
                    record: None,
                }))
            }
            SessionMode::Database => Ok(adapter
                .get_session_and_user(token)
                .await?
                .map(|SessionAndUser { session, user }| CurrentSession {
                    user,
                    record: Some(session),
                })),
        }
    }

    /// Email branch: the presented one-time token (already consumed by the
    /// verification resolver) proves control of the address.
    async fn resolve_email(
        &self,
        adapter: &dyn Adapter,
        current: Option<CurrentSession>,
        profile: &Profile,
    ) -> Result<Resolution> {
        let email = profile
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                AuthError::Configuration("email sign-in requires a profile email".into())
            })?;

        let (user, is_new_user) = match adapter.get_user_by_email(email).await? {
            Some(mut user) => {
                // The caller is switching identity, not merging: drop the
                // stale database session belonging to someone else.
                if let Some(current) = &current {
                    if let Some(record) = &current.record {
                        if current.user.id != user.id {
                            adapter.delete_session(&record.session_token).await?;
                        }
                    }
                }

                user.email_verified = Some(Utc::now());
                (adapter.update_user(user).await?, false)
            }
            None => {
                let mut draft = profile.to_user_draft();
                draft.email_verified = Some(Utc::now());
                (adapter.create_user(draft).await?, true)
            }
        };

        self.logger.info(&format!(
            "email sign-in resolved for user {} (new: {is_new_user})",
            user.id
        ));

        let session = materialize(adapter, self.mode(), self.max_age(), &user).await?;
        Ok(Resolution {
            user,
            session,
            is_new_user,
        })
    }

    /// OAuth/OIDC branch.
    async fn resolve_oauth(
        &self,
        adapter: &dyn Adapter,
        current: Option<CurrentSession>,
        profile: &Profile,
        account: &AccountDraft,
    ) -> Result<Resolution> {
        // Provider binding takes precedence over any email heuristic.
        let owner = adapter
            .get_user_by_account(&account.provider, &account.provider_account_id)
            .await?;

        match (owner, current) {
            // Known account, caller signed in.
            (Some(owner), Some(current)) => {
                if owner.id != current.user.id {
                    // The primary hijack-prevention guard: never silently
                    // re-bind an account someone else owns.
                    self.logger.warn(&format!(
                        "rejected sign-in via {}: account belongs to a different user",
                        account.provider
                    ));
                    return Err(AuthError::AccountNotLinked {
                        provider: account.provider.clone(),
                        reason: LinkRejection::AccountAlreadyLinked,
                    });
                }

                // Idempotent re-login: resume the session unchanged.
                let session = match current.record {
                    Some(record) => SessionHandle::Database(record),
                    None => SessionHandle::Claims(SessionClaims::for_user(&owner)),
                };
                Ok(Resolution {
                    user: owner,
                    session,
                    is_new_user: false,
                })
            }

            // Known account, no session: ordinary returning sign-in.
            (Some(owner), None) => {
                let owner = self.refresh_profile_fields(adapter, owner, profile).await?;
                let session = materialize(adapter, self.mode(), self.max_age(), &owner).await?;
                Ok(Resolution {
                    user: owner,
                    session,
                    is_new_user: false,
                })
            }

            // New binding, caller signed in: the user is adding a provider
            // to their existing identity.
            (None, Some(current)) => {
                adapter
                    .link_account(account.clone().into_account(current.user.id.clone()))
                    .await?;
                self.logger.info(&format!(
                    "linked {} account to signed-in user {}",
                    account.provider, current.user.id
                ));

                let session = match current.record {
                    Some(record) => SessionHandle::Database(record),
                    None => SessionHandle::Claims(SessionClaims::for_user(&current.user)),
                };
                Ok(Resolution {
                    user: current.user,
                    session,
                    is_new_user: false,
                })
            }

            // New binding, signed out: create or adopt a user, then link.
            (None, None) => {
                let by_email = match profile.email.as_deref() {
                    Some(email) if !email.is_empty() => adapter.get_user_by_email(email).await?,
                    _ => None,
                };

                let (user, is_new_user) = match by_email {
                    Some(user) if self.options.allows_dangerous_email_linking(&account.provider) => {
                        self.logger.warn(&format!(
                            "email auto-linking {} account to existing user {}",
                            account.provider, user.id
                        ));
                        (user, false)
                    }
                    Some(_) => {
                        // An account with this email exists but is not bound
                        // to this provider: force the user to sign in with
                        // their existing method and link explicitly.
                        return Err(AuthError::AccountNotLinked {
                            provider: account.provider.clone(),
                            reason: LinkRejection::EmailAlreadyInUse,
                        });
                    }
                    None => (adapter.create_user(profile.to_user_draft()).await?, true),
                };

                adapter
                    .link_account(account.clone().into_account(user.id.clone()))
                    .await?;
                self.logger.info(&format!(
                    "{} sign-in resolved for user {} (new: {is_new_user})",
                    account.provider, user.id
                ));

                let session = materialize(adapter, self.mode(), self.max_age(), &user).await?;
                Ok(Resolution {
                    user,
                    session,
                    is_new_user,
                })
            }
        }
    }

    /// Refresh display fields from a returning provider profile. Email is
    /// never rewritten here; that would reopen the spoofing hole the
    /// linking policy closes.
    async fn refresh_profile_fields(
        &self,
        adapter: &dyn Adapter,
        mut user: User,
        profile: &Profile,
    ) -> Result<User> {
        let mut changed = false;
        if let Some(name) = &profile.name {
            if user.name.as_ref() != Some(name) {
                user.name = Some(name.clone());
                changed = true;
            }
        }
        if let Some(image) = &profile.image {
            if user.image.as_ref() != Some(image) {
                user.image = Some(image.clone());
                changed = true;
            }
        }
        if changed {
            user = adapter.update_user(user).await?;
        }
        Ok(user)
    }

    /// Hand the profile back as the user, unpersisted.
    fn passthrough(&self, profile: &Profile, account: &AccountDraft) -> Result<Resolution> {
        let user = User {
            id: profile
                .id
                .clone()
                .unwrap_or_else(|| account.provider_account_id.clone()),
            name: profile.name.clone(),
            email: profile.email.clone(),
            email_verified: profile.email_verified,
            image: profile.image.clone(),
        };
        Ok(Resolution {
            session: SessionHandle::Claims(SessionClaims::for_user(&user)),
            user,
            is_new_user: false,
        })
    }

    fn max_age(&self) -> i64 {
        self.options.session.max_age_seconds
    }
}
