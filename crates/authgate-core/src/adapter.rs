// Storage adapter trait: the contract every backing store implements.
//
// The engine consumes this as a trait object and issues only these fixed
// operations. Lookups return `Ok(None)` for "not found"; errors are
// reserved for genuine I/O and constraint failures.

use std::fmt;

use async_trait::async_trait;

use crate::error::AuthError;
use crate::models::{Account, Session, User, UserDraft, VerificationToken};

/// Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, AuthError>;

/// A session paired with its owning user, from a single lookup.
#[derive(Debug, Clone)]
pub struct SessionAndUser {
    pub session: Session,
    pub user: User,
}

/// The storage contract.
///
/// All operations are suspending I/O calls. Deleting a user must cascade to
/// its accounts and sessions; that cascade is the adapter's responsibility,
/// not the engine's. `link_account` must enforce uniqueness of
/// (provider, provider_account_id) and fail with [`AuthError::Conflict`]
/// when a concurrent caller has already claimed the pair.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, id: &str) -> AdapterResult<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<User>>;

    /// Look up the owner of an account by its unique join key.
    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>>;

    async fn create_user(&self, draft: UserDraft) -> AdapterResult<User>;

    /// Replace the stored user identified by `user.id`.
    async fn update_user(&self, user: User) -> AdapterResult<User>;

    async fn delete_user(&self, id: &str) -> AdapterResult<()>;

    // ─── Accounts ────────────────────────────────────────────────

    async fn link_account(&self, account: Account) -> AdapterResult<Account>;

    async fn unlink_account(&self, provider: &str, provider_account_id: &str) -> AdapterResult<()>;

    // ─── Sessions ────────────────────────────────────────────────

    async fn create_session(&self, session: Session) -> AdapterResult<Session>;

    async fn get_session_and_user(&self, session_token: &str) -> AdapterResult<Option<SessionAndUser>>;

    /// Update the stored session identified by `session.session_token`.
    /// Returns `None` if no such session exists.
    async fn update_session(&self, session: Session) -> AdapterResult<Option<Session>>;

    async fn delete_session(&self, session_token: &str) -> AdapterResult<()>;

    // ─── Verification tokens ─────────────────────────────────────

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken>;

    /// Atomic find-and-delete, so a consumed token can never be replayed.
    /// Returns the token record even when it is past expiry; the caller
    /// decides how to reject it.
    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>>;
}
