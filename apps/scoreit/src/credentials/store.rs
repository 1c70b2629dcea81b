use std::sync::Arc;

use tracing::{debug, info};

use crate::credentials::storage::{MemoryStorage, ScopeStorage};
use crate::models::session::{Profile, Scope, Session, StoredSession, UserInfo};

/// Resolves the two storage scopes into one logical current session.
///
/// Rules:
/// - `commit` clears BOTH scopes before writing the chosen one, so a previous
///   user's token or cached profile can never survive in the other scope.
/// - `current` reads Durable first, then Ephemeral. Durable wins if both are
///   (abnormally) populated.
/// - Nothing is ever merged across scopes.
#[derive(Clone)]
pub struct CredentialStore {
    durable: Arc<dyn ScopeStorage>,
    ephemeral: Arc<dyn ScopeStorage>,
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn ScopeStorage>, ephemeral: Arc<dyn ScopeStorage>) -> Self {
        Self { durable, ephemeral }
    }

    /// Both scopes in memory. Used by tests and by callers with no durable storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    fn storage(&self, scope: Scope) -> &dyn ScopeStorage {
        match scope {
            Scope::Durable => self.durable.as_ref(),
            Scope::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    /// Makes `token` the current session, stored only in `scope`.
    pub fn commit(
        &self,
        token: impl Into<String>,
        scope: Scope,
        user: UserInfo,
        profile: Option<Profile>,
    ) {
        self.clear();
        let record = StoredSession {
            token: token.into(),
            user,
            profile,
        };
        self.storage(scope).save(&record);
        info!("Session committed to {scope} scope for {}", record.user.email);
    }

    /// The current session, if either scope holds a non-empty token.
    pub fn current(&self) -> Option<Session> {
        [Scope::Durable, Scope::Ephemeral]
            .into_iter()
            .find_map(|scope| {
                self.storage(scope)
                    .load()
                    .filter(|record| !record.token.is_empty())
                    .map(|record| Session::from_stored(record, scope))
            })
    }

    /// Bearer token of the current session.
    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    /// Erases both scopes unconditionally.
    pub fn clear(&self) {
        self.durable.clear();
        self.ephemeral.clear();
        debug!("Both credential scopes cleared");
    }

    /// Replaces the cached profile in the current session's own scope.
    /// No-op without a session.
    pub fn update_profile(&self, profile: Profile) {
        let Some(session) = self.current() else {
            debug!("No session; profile cache update skipped");
            return;
        };
        let record = StoredSession {
            token: session.token,
            user: session.user,
            profile: Some(profile),
        };
        self.storage(session.scope).save(&record);
    }
}
