// End-to-end resolution behavior against the in-memory store.

use std::sync::Arc;

use chrono::TimeDelta;

use authgate::crypto::claims::seal_claims;
use authgate::engine::ResolutionEngine;
use authgate::verification::{consume_verification_token, issue_verification_token};
use authgate_core::adapter::{Adapter, AdapterResult, SessionAndUser};
use authgate_core::error::{AuthError, LinkRejection};
use authgate_core::logger::AuthLogger;
use authgate_core::models::{
    Account, AccountDraft, AccountKind, Profile, Session, User, UserDraft, VerificationToken,
};
use authgate_core::options::{AuthOptions, ProviderOptions, SessionMode};
use authgate_memory::MemoryAdapter;

const SECRET: &str = "an-integration-test-secret-value";

fn engine(store: &MemoryAdapter) -> ResolutionEngine {
    ResolutionEngine::new(Arc::new(store.clone()), AuthOptions::new(SECRET))
        .with_logger(AuthLogger::disabled())
}

fn engine_with(store: &MemoryAdapter, options: AuthOptions) -> ResolutionEngine {
    ResolutionEngine::new(Arc::new(store.clone()), options).with_logger(AuthLogger::disabled())
}

fn profile(email: &str) -> Profile {
    Profile {
        id: Some("123".into()),
        name: Some("Ada Lovelace".into()),
        email: Some(email.into()),
        image: None,
        email_verified: None,
    }
}

fn oauth(provider: &str, provider_account_id: &str) -> AccountDraft {
    AccountDraft::new(provider, provider_account_id, AccountKind::OAuth)
}

fn email_account(address: &str) -> AccountDraft {
    AccountDraft::new("email", address, AccountKind::Email)
}

fn session_token(resolution: &authgate::Resolution) -> String {
    resolution
        .session
        .as_database()
        .expect("database session")
        .session_token
        .clone()
}

// ─── Scenarios ───────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_first_oauth_sign_in_creates_everything() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    let resolution = engine
        .resolve(None, &profile("new@x.com"), &oauth("github", "123"))
        .await
        .unwrap();

    assert!(resolution.is_new_user);
    assert_eq!(resolution.user.email.as_deref(), Some("new@x.com"));
    assert_eq!(store.account_count().await, 1);
    assert_eq!(store.session_count().await, 1);

    let owner = store.get_user_by_account("github", "123").await.unwrap().unwrap();
    assert_eq!(owner.id, resolution.user.id);
    assert_eq!(resolution.session.user_id(), resolution.user.id);
}

#[tokio::test]
async fn scenario_b_returning_oauth_sign_in_reuses_the_user() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);
    let account = oauth("github", "123");

    let first = engine.resolve(None, &profile("ada@x.com"), &account).await.unwrap();

    // Signed out again; same provider account comes back.
    let second = engine.resolve(None, &profile("ada@x.com"), &account).await.unwrap();

    assert!(!second.is_new_user);
    assert_eq!(second.user.id, first.user.id);
    // A fresh session was materialized for the new sign-in
    assert_ne!(session_token(&second), session_token(&first));
    assert_eq!(store.session_count().await, 2);
    // But no duplicate user or account
    assert_eq!(store.account_count().await, 1);
}

#[tokio::test]
async fn scenario_c_expired_email_token_is_rejected_and_consumed() {
    let store = MemoryAdapter::new();

    // A token that expired an hour ago
    store
        .create_verification_token(VerificationToken {
            identifier: "a@b.com".into(),
            token: authgate::verification::hash_token("tok1", SECRET),
            expires: chrono::Utc::now() - TimeDelta::hours(1),
        })
        .await
        .unwrap();

    let err = consume_verification_token(&store, "a@b.com", "tok1", SECRET)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Verification { has_invite: true, expired: true }
    ));

    // Consumed regardless: it cannot be replayed
    assert_eq!(store.verification_token_count().await, 0);
}

#[tokio::test]
async fn scenario_d_signed_in_user_links_a_second_provider() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    let first = engine
        .resolve(None, &profile("ada@x.com"), &oauth("github", "123"))
        .await
        .unwrap();
    let token = session_token(&first);

    let linked = engine
        .resolve(Some(&token), &profile("ada@x.com"), &oauth("google", "456"))
        .await
        .unwrap();

    assert!(!linked.is_new_user);
    assert_eq!(linked.user.id, first.user.id);
    assert_eq!(store.account_count().await, 2);

    let owner = store.get_user_by_account("google", "456").await.unwrap().unwrap();
    assert_eq!(owner.id, first.user.id);

    // Session is unchanged: same token, nothing extra materialized
    assert_eq!(session_token(&linked), token);
    assert_eq!(store.session_count().await, 1);
}

// ─── Properties ──────────────────────────────────────────────────

#[tokio::test]
async fn p1_store_conflict_surfaces_through_the_engine() {
    // Simulate the loser of a concurrent first-link race: the account
    // lookup misses, but by link time the store has the binding.
    let inner = MemoryAdapter::new();
    let winner = inner
        .create_user(UserDraft {
            email: Some("winner@x.com".into()),
            ..UserDraft::default()
        })
        .await
        .unwrap();
    inner
        .link_account(AccountDraft::new("github", "123", AccountKind::OAuth).into_account(winner.id))
        .await
        .unwrap();

    let store = StaleAccountReads(inner);
    let engine = ResolutionEngine::new(Arc::new(store), AuthOptions::new(SECRET))
        .with_logger(AuthLogger::disabled());

    let err = engine
        .resolve(None, &profile("racer@x.com"), &oauth("github", "123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)));
}

#[tokio::test]
async fn p2_resolving_twice_with_the_same_session_is_idempotent() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);
    let account = oauth("github", "123");

    let first = engine.resolve(None, &profile("ada@x.com"), &account).await.unwrap();
    let token = session_token(&first);

    let again = engine
        .resolve(Some(&token), &profile("ada@x.com"), &account)
        .await
        .unwrap();
    let once_more = engine
        .resolve(Some(&token), &profile("ada@x.com"), &account)
        .await
        .unwrap();

    assert_eq!(again.user.id, first.user.id);
    assert_eq!(once_more.user.id, first.user.id);
    assert_eq!(session_token(&again), token);
    assert_eq!(session_token(&once_more), token);
    // No duplicate session records
    assert_eq!(store.session_count().await, 1);
}

#[tokio::test]
async fn p3_matching_email_is_never_silently_merged() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    // An existing user with email E and no account for this provider
    store
        .create_user(UserDraft {
            email: Some("e@x.com".into()),
            ..UserDraft::default()
        })
        .await
        .unwrap();

    let err = engine
        .resolve(None, &profile("e@x.com"), &oauth("github", "123"))
        .await
        .unwrap_err();

    match err {
        AuthError::AccountNotLinked { provider, reason } => {
            assert_eq!(provider, "github");
            assert_eq!(reason, LinkRejection::EmailAlreadyInUse);
        }
        other => panic!("expected AccountNotLinked, got {other:?}"),
    }

    // Nothing was created or linked
    assert_eq!(store.account_count().await, 0);
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn p4_signed_in_user_cannot_take_over_anothers_account() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    // U2 owns github/123
    let u2 = engine
        .resolve(None, &profile("u2@x.com"), &oauth("github", "123"))
        .await
        .unwrap();

    // U1 signs in with a different provider
    let u1 = engine
        .resolve(None, &profile("u1@x.com"), &oauth("google", "456"))
        .await
        .unwrap();
    assert_ne!(u1.user.id, u2.user.id);

    // U1, signed in, presents U2's github identity
    let err = engine
        .resolve(Some(&session_token(&u1)), &profile("u1@x.com"), &oauth("github", "123"))
        .await
        .unwrap_err();

    match err {
        AuthError::AccountNotLinked { reason, .. } => {
            assert_eq!(reason, LinkRejection::AccountAlreadyLinked);
        }
        other => panic!("expected AccountNotLinked, got {other:?}"),
    }

    // U1's identity is unchanged: still only the google binding
    let github_owner = store.get_user_by_account("github", "123").await.unwrap().unwrap();
    assert_eq!(github_owner.id, u2.user.id);
    assert_eq!(store.account_count().await, 2);
}

#[tokio::test]
async fn p5_valid_email_token_verifies_the_user_and_is_single_use() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    let unverified = store
        .create_user(UserDraft {
            email: Some("a@b.com".into()),
            ..UserDraft::default()
        })
        .await
        .unwrap();
    assert!(unverified.email_verified.is_none());

    issue_verification_token(&store, "a@b.com", "tok1", SECRET, TimeDelta::hours(1))
        .await
        .unwrap();

    consume_verification_token(&store, "a@b.com", "tok1", SECRET)
        .await
        .unwrap();

    let resolution = engine
        .resolve(None, &profile("a@b.com"), &email_account("a@b.com"))
        .await
        .unwrap();

    assert!(!resolution.is_new_user);
    assert_eq!(resolution.user.id, unverified.id);
    assert!(resolution.user.email_verified.is_some());

    // The stored record reflects the verification
    let stored = store.get_user(&unverified.id).await.unwrap().unwrap();
    assert!(stored.email_verified.is_some());

    // And the token no longer exists
    assert_eq!(store.verification_token_count().await, 0);
}

// ─── Email branch ────────────────────────────────────────────────

#[tokio::test]
async fn email_sign_in_creates_a_verified_user_when_none_exists() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    let resolution = engine
        .resolve(None, &profile("fresh@x.com"), &email_account("fresh@x.com"))
        .await
        .unwrap();

    assert!(resolution.is_new_user);
    assert!(resolution.user.email_verified.is_some());
    assert_eq!(store.session_count().await, 1);
}

#[tokio::test]
async fn email_sign_in_switches_identity_and_drops_the_stale_session() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    // User A is signed in via OAuth
    let a = engine
        .resolve(None, &profile("a@x.com"), &oauth("github", "123"))
        .await
        .unwrap();
    let a_token = session_token(&a);

    // User B already exists
    let b = store
        .create_user(UserDraft {
            email: Some("b@x.com".into()),
            ..UserDraft::default()
        })
        .await
        .unwrap();

    // While signed in as A, the caller completes email sign-in as B
    let resolution = engine
        .resolve(Some(&a_token), &profile("b@x.com"), &email_account("b@x.com"))
        .await
        .unwrap();

    assert_eq!(resolution.user.id, b.id);
    // A's session is gone; only B's fresh session remains
    assert!(store.get_session_and_user(&a_token).await.unwrap().is_none());
    assert_eq!(store.session_count().await, 1);
}

// ─── Dangerous email auto-linking (per-provider opt-in) ──────────

#[tokio::test]
async fn opted_in_provider_adopts_the_matching_email_user() {
    let store = MemoryAdapter::new();
    let mut provider = ProviderOptions::new("workos", AccountKind::OAuth);
    provider.allow_dangerous_email_account_linking = true;
    let engine = engine_with(&store, AuthOptions::new(SECRET).with_provider(provider));

    let existing = store
        .create_user(UserDraft {
            email: Some("e@x.com".into()),
            ..UserDraft::default()
        })
        .await
        .unwrap();

    let resolution = engine
        .resolve(None, &profile("e@x.com"), &oauth("workos", "789"))
        .await
        .unwrap();

    assert!(!resolution.is_new_user);
    assert_eq!(resolution.user.id, existing.id);
    let owner = store.get_user_by_account("workos", "789").await.unwrap().unwrap();
    assert_eq!(owner.id, existing.id);
}

#[tokio::test]
async fn opt_in_does_not_leak_across_providers() {
    let store = MemoryAdapter::new();
    let mut trusted = ProviderOptions::new("workos", AccountKind::OAuth);
    trusted.allow_dangerous_email_account_linking = true;
    let engine = engine_with(&store, AuthOptions::new(SECRET).with_provider(trusted));

    store
        .create_user(UserDraft {
            email: Some("e@x.com".into()),
            ..UserDraft::default()
        })
        .await
        .unwrap();

    // github was never opted in
    let err = engine
        .resolve(None, &profile("e@x.com"), &oauth("github", "123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountNotLinked { .. }));
}

// ─── Stateless sessions ──────────────────────────────────────────

#[tokio::test]
async fn stateless_mode_materializes_claims_not_records() {
    let store = MemoryAdapter::new();
    let engine = engine_with(
        &store,
        AuthOptions::new(SECRET).with_session_mode(SessionMode::Stateless),
    );

    let resolution = engine
        .resolve(None, &profile("ada@x.com"), &oauth("github", "123"))
        .await
        .unwrap();

    let claims = resolution.session.as_claims().expect("claims session");
    assert_eq!(claims.sub, resolution.user.id);
    assert_eq!(claims.email.as_deref(), Some("ada@x.com"));
    assert_eq!(store.session_count().await, 0);
    // The account and user are still persisted
    assert_eq!(store.account_count().await, 1);
}

#[tokio::test]
async fn stateless_session_token_identifies_the_caller_for_linking() {
    let store = MemoryAdapter::new();
    let engine = engine_with(
        &store,
        AuthOptions::new(SECRET).with_session_mode(SessionMode::Stateless),
    );

    let first = engine
        .resolve(None, &profile("ada@x.com"), &oauth("github", "123"))
        .await
        .unwrap();
    let sealed = seal_claims(first.session.as_claims().unwrap(), SECRET, 3600).unwrap();

    let linked = engine
        .resolve(Some(&sealed), &profile("ada@x.com"), &oauth("google", "456"))
        .await
        .unwrap();

    assert_eq!(linked.user.id, first.user.id);
    let owner = store.get_user_by_account("google", "456").await.unwrap().unwrap();
    assert_eq!(owner.id, first.user.id);
}

#[tokio::test]
async fn undecodable_stateless_token_is_treated_as_signed_out() {
    let store = MemoryAdapter::new();
    let engine = engine_with(
        &store,
        AuthOptions::new(SECRET).with_session_mode(SessionMode::Stateless),
    );

    // A garbage token must not fail the attempt; the caller is simply
    // signed out, so this becomes a plain first sign-in.
    let resolution = engine
        .resolve(Some("garbage"), &profile("ada@x.com"), &oauth("github", "123"))
        .await
        .unwrap();
    assert!(resolution.is_new_user);
}

#[tokio::test]
async fn unknown_database_token_is_treated_as_signed_out() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    let resolution = engine
        .resolve(Some("no-such-session"), &profile("ada@x.com"), &oauth("github", "123"))
        .await
        .unwrap();
    assert!(resolution.is_new_user);
}

// ─── Ordering: provider binding beats email heuristics ───────────

#[tokio::test]
async fn established_binding_takes_precedence_over_profile_email() {
    let store = MemoryAdapter::new();
    let engine = engine(&store);

    // Owner signed up with github/123 under one email
    let owner = engine
        .resolve(None, &profile("owner@x.com"), &oauth("github", "123"))
        .await
        .unwrap();

    // Someone else exists with the email a spoofed profile will claim
    store
        .create_user(UserDraft {
            email: Some("victim@x.com".into()),
            ..UserDraft::default()
        })
        .await
        .unwrap();

    // Same provider account returns with a spoofed email: the binding wins
    let mut spoofed = profile("victim@x.com");
    spoofed.name = None;
    let resolution = engine
        .resolve(None, &spoofed, &oauth("github", "123"))
        .await
        .unwrap();
    assert_eq!(resolution.user.id, owner.user.id);
    // The spoofed email was not adopted
    assert_eq!(resolution.user.email.as_deref(), Some("owner@x.com"));
}

// ─── Race helper ─────────────────────────────────────────────────

/// Delegates to the in-memory store but always misses on the account
/// lookup, replaying what the loser of a concurrent first-link race sees.
#[derive(Debug)]
struct StaleAccountReads(MemoryAdapter);

#[async_trait::async_trait]
impl Adapter for StaleAccountReads {
    async fn get_user(&self, id: &str) -> AdapterResult<Option<User>> {
        self.0.get_user(id).await
    }
    async fn get_user_by_email(&self, email: &str) -> AdapterResult<Option<User>> {
        self.0.get_user_by_email(email).await
    }
    async fn get_user_by_account(
        &self,
        _provider: &str,
        _provider_account_id: &str,
    ) -> AdapterResult<Option<User>> {
        Ok(None)
    }
    async fn create_user(&self, draft: UserDraft) -> AdapterResult<User> {
        self.0.create_user(draft).await
    }
    async fn update_user(&self, user: User) -> AdapterResult<User> {
        self.0.update_user(user).await
    }
    async fn delete_user(&self, id: &str) -> AdapterResult<()> {
        self.0.delete_user(id).await
    }
    async fn link_account(&self, account: Account) -> AdapterResult<Account> {
        self.0.link_account(account).await
    }
    async fn unlink_account(&self, provider: &str, provider_account_id: &str) -> AdapterResult<()> {
        self.0.unlink_account(provider, provider_account_id).await
    }
    async fn create_session(&self, session: Session) -> AdapterResult<Session> {
        self.0.create_session(session).await
    }
    async fn get_session_and_user(&self, token: &str) -> AdapterResult<Option<SessionAndUser>> {
        self.0.get_session_and_user(token).await
    }
    async fn update_session(&self, session: Session) -> AdapterResult<Option<Session>> {
        self.0.update_session(session).await
    }
    async fn delete_session(&self, token: &str) -> AdapterResult<()> {
        self.0.delete_session(token).await
    }
    async fn create_verification_token(
        &self,
        token: VerificationToken,
    ) -> AdapterResult<VerificationToken> {
        self.0.create_verification_token(token).await
    }
    async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> AdapterResult<Option<VerificationToken>> {
        self.0.use_verification_token(identifier, token).await
    }
}
