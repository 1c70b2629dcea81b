//! Route Guard: decides, per protected navigation, whether the stored session is live.
//!
//! A stored token is necessary but not sufficient: the backend may have
//! revoked it (logout-everywhere, password change, expiry). Every entry
//! re-validates; nothing is cached between navigations.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::session_client::SessionApi;
use crate::credentials::CredentialStore;
use crate::models::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Neither scope holds a token. No request was made.
    NoSession,
    /// Backend answered `active: false`.
    Inactive,
    /// Backend rejected the token (401).
    Rejected,
    /// Session check failed for any other reason (network, 5xx, bad body).
    CheckFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    Checking,
    Authorized(Session),
    Unauthorized(DenyReason),
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuardState::Checking)
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    store: CredentialStore,
    sessions: Arc<dyn SessionApi>,
}

impl RouteGuard {
    pub fn new(store: CredentialStore, sessions: Arc<dyn SessionApi>) -> Self {
        Self { store, sessions }
    }

    /// Resolves one navigation to a terminal state.
    pub async fn enter(&self) -> GuardState {
        self.enter_with(|_| {}).await
    }

    /// Like `enter`, reporting every state transition (`Checking` first) to `observe`.
    pub async fn enter_with(&self, mut observe: impl FnMut(&GuardState)) -> GuardState {
        observe(&GuardState::Checking);
        let outcome = self.resolve().await;
        observe(&outcome);
        outcome
    }

    async fn resolve(&self) -> GuardState {
        let Some(session) = self.store.current() else {
            debug!("No stored session; access denied without a check");
            return GuardState::Unauthorized(DenyReason::NoSession);
        };

        match self.sessions.check(&session.token).await {
            Ok(status) if status.active => {
                debug!("Session for {} is active", session.user.email);
                GuardState::Authorized(session)
            }
            Ok(_) => {
                info!("Backend reports session inactive; clearing local credentials");
                self.store.clear();
                GuardState::Unauthorized(DenyReason::Inactive)
            }
            Err(e) if e.is_auth() => {
                info!("Backend rejected stored token; clearing local credentials");
                self.store.clear();
                GuardState::Unauthorized(DenyReason::Rejected)
            }
            Err(e) => {
                // Not proof of revocation: keep the token for the next navigation.
                warn!("Session check failed: {e}");
                GuardState::Unauthorized(DenyReason::CheckFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::ApiMessage;
    use crate::auth::session_client::SessionStatus;
    use crate::errors::ClientError;
    use crate::models::session::{Scope, UserInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Active(bool),
        Unauthorized,
        Unreachable,
    }

    struct FakeSessions {
        reply: Reply,
        checks: AtomicUsize,
    }

    impl FakeSessions {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                checks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SessionApi for FakeSessions {
        async fn create(&self, _token: &str) -> Result<ApiMessage, ClientError> {
            Ok(ApiMessage::default())
        }

        async fn check(&self, _token: &str) -> Result<SessionStatus, ClientError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Active(active) => Ok(SessionStatus { active }),
                Reply::Unauthorized => Err(ClientError::Unauthorized("Invalid token".into())),
                Reply::Unreachable => Err(ClientError::Api {
                    status: 503,
                    message: "down".into(),
                }),
            }
        }

        async fn delete(&self, _token: &str) -> Result<ApiMessage, ClientError> {
            Ok(ApiMessage::default())
        }

        async fn delete_all(&self, _token: &str) -> Result<ApiMessage, ClientError> {
            Ok(ApiMessage::default())
        }
    }

    fn logged_in_store(scope: Scope) -> CredentialStore {
        let store = CredentialStore::in_memory();
        store.commit(
            "tok",
            scope,
            UserInfo {
                name: "Ada".into(),
                email: "ada@x.io".into(),
                is_google_user: false,
            },
            None,
        );
        store
    }

    #[tokio::test]
    async fn test_no_session_is_unauthorized_without_network_call() {
        let sessions = FakeSessions::new(Reply::Active(true));
        let guard = RouteGuard::new(CredentialStore::in_memory(), sessions.clone());

        assert_eq!(
            guard.enter().await,
            GuardState::Unauthorized(DenyReason::NoSession)
        );
        assert_eq!(sessions.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_active_session_is_authorized_from_either_scope() {
        for scope in [Scope::Durable, Scope::Ephemeral] {
            let sessions = FakeSessions::new(Reply::Active(true));
            let guard = RouteGuard::new(logged_in_store(scope), sessions.clone());

            match guard.enter().await {
                GuardState::Authorized(session) => assert_eq!(session.scope, scope),
                other => panic!("expected Authorized, got {other:?}"),
            }
            assert_eq!(sessions.checks.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_inactive_session_is_unauthorized_and_cleared() {
        let store = logged_in_store(Scope::Durable);
        let guard = RouteGuard::new(store.clone(), FakeSessions::new(Reply::Active(false)));

        assert_eq!(
            guard.enter().await,
            GuardState::Unauthorized(DenyReason::Inactive)
        );
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized_and_cleared() {
        let store = logged_in_store(Scope::Ephemeral);
        let guard = RouteGuard::new(store.clone(), FakeSessions::new(Reply::Unauthorized));

        assert_eq!(
            guard.enter().await,
            GuardState::Unauthorized(DenyReason::Rejected)
        );
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_failed_check_is_unauthorized_but_keeps_token() {
        let store = logged_in_store(Scope::Durable);
        let guard = RouteGuard::new(store.clone(), FakeSessions::new(Reply::Unreachable));

        assert_eq!(
            guard.enter().await,
            GuardState::Unauthorized(DenyReason::CheckFailed)
        );
        assert!(store.current().is_some());
    }

    #[tokio::test]
    async fn test_every_entry_revalidates() {
        let sessions = FakeSessions::new(Reply::Active(true));
        let guard = RouteGuard::new(logged_in_store(Scope::Durable), sessions.clone());

        guard.enter().await;
        guard.enter().await;
        assert_eq!(sessions.checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_enter_with_reports_checking_then_terminal() {
        let guard = RouteGuard::new(
            logged_in_store(Scope::Durable),
            FakeSessions::new(Reply::Active(true)),
        );
        let mut seen = Vec::new();
        guard.enter_with(|state| seen.push(state.is_terminal())).await;
        assert_eq!(seen, vec![false, true]);
    }
}
