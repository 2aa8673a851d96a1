// In-memory store implementing the adapter contract.
//
// Thread-safe via `tokio::sync::RwLock`. Deleting a user cascades to its
// accounts and sessions, as the contract requires of every store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use authgate_core::adapter::{Adapter, AdapterResult, SessionAndUser};
use authgate_core::error::AuthError;
use authgate_core::models::{Account, Session, User, UserDraft, VerificationToken};

#[derive(Debug, Default, Clone)]
struct Tables {
    users: HashMap<String, User>,
    accounts: Vec<Account>,
    /// Keyed by session token.
    sessions: HashMap<String, Session>,
    verification_tokens: Vec<VerificationToken>,
}

/// In-memory reference store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total session records, for assertions in tests.
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    /// Total account records, for assertions in tests.
    pub async fn account_count(&self) -> usize {
        self.tables.read().await.accounts.len()
    }

    /// Total verification token records, for assertions in tests.
    pub async fn verification_token_count(&self) -> usize {
        self.tables.read().await.verification_tokens.len()
    }

    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        *tables = Tables::default();
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn get_user(&self, id: &str) -> AdapterResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<User>> {
        let tables = self.tables.read().await;
        let account = tables
            .accounts
            .iter()
            .find(|a| a.provider == provider && a.provider_account_id == provider_account_id);
        Ok(account.and_then(|a| tables.users.get(&a.user_id).cloned()))
    }

    async fn create_user(&self, draft: UserDraft) -> AdapterResult<User> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: draft.name,
            email: draft.email,
            email_verified: draft.email_verified,
            image: draft.image,
        };
        self.tables
            .write()
            .await
            .users
            .insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> AdapterResult<User> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(AuthError::Store(format!("no user with id {}", user.id)));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> AdapterResult<()> {
        let mut tables = self.tables.write().await;
        tables.users.remove(id);
        // Cascade: accounts and sessions go with their user.
        tables.accounts.retain(|a| a.user_id != id);
        tables.sessions.retain(|_, s| s.user_id != id);
        Ok(())
    }

    async fn link_account(&self, account: Account) -> AdapterResult<Account> {
        let mut tables = self.tables.write().await;
        // Unique index on (provider, providerAccountId): the loser of a
        // concurrent first-link race fails here.
        let taken = tables.accounts.iter().any(|a| {
            a.provider == account.provider && a.provider_account_id == account.provider_account_id
        });
        if taken {
            return Err(AuthError::Conflict(format!(
                "account {}/{} is already linked",
                account.provider, account.provider_account_id
            )));
        }
        tables.accounts.push(account.clone());
        Ok(account)
    }

    async fn unlink_account(&self, provider: &str, provider_account_id: &str) -> AdapterResult<()> {
        self.tables.write().await.accounts.retain(|a| {
            !(a.provider == provider && a.provider_account_id == provider_account_id)
        });
        Ok(())
    }

    async fn create_session(&self, session: Session) -> AdapterResult<Session> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.session_token.clone(), session.clone());
        Ok(session)
    }

    async fn get_session_and_user(&self, session_token: &str) -> AdapterResult<Option<SessionAndUser>> {
        let tables = self.tables.read().await;
        let session = match tables.sessions.get(session_token) {
            Some(s) => s.clone(),
            None => return Ok(None),
        };
        Ok(tables
            .users
            .get(&session.user_id)
            .cloned()
            .map(|user| SessionAndUser { session, user }))
    }

    async fn update_session(&self, session: Session) -> AdapterResult<Option<Session>> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(&session.session_token) {
            return Ok(None);
        }
        tables
            .sessions
            .insert(session.session_token.clone(), session.clone());
        Ok(Some(session))
    }

    async fn delete_session(&self, session_token: &str) -> AdapterResult<()> {
        self.tables.write().await.sessions.remove(session_token);
        Ok(())
    }

    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken> {
        self.tables
            .write()
            .await
            .verification_tokens
            .push(token.clone());
        Ok(token)
    }

    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>> {
        // Find-and-delete under one write lock, so a token is consumed at
        // most once.
        let mut tables = self.tables.write().await;
        let position = tables
            .verification_tokens
            .iter()
            .position(|t| t.identifier == identifier && t.token == token);
        Ok(position.map(|i| tables.verification_tokens.remove(i)))
    }
}
