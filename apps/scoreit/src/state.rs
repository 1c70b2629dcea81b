use std::sync::Arc;

use crate::api_client::ApiClient;
use crate::auth::guard::RouteGuard;
use crate::auth::lifecycle::AuthFlow;
use crate::config::Config;
use crate::credentials::{CredentialStore, FileStorage, MemoryStorage};
use crate::history::{HistoryApi, HistoryView};
use crate::pipeline::MatchOrchestrator;

/// Shared client state handed to every command handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: ApiClient,
    /// Durable scope on disk, Ephemeral scope in memory for this process.
    pub store: CredentialStore,
    pub auth: AuthFlow,
    pub guard: RouteGuard,
    pub orchestrator: Arc<MatchOrchestrator>,
    pub history: Arc<dyn HistoryApi>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let client = ApiClient::new(config.backend_url.clone(), config.http_timeout);
        let store = CredentialStore::new(
            Arc::new(FileStorage::new(config.session_file())),
            Arc::new(MemoryStorage::new()),
        );
        let shared = Arc::new(client.clone());

        Self {
            auth: AuthFlow::from_client(store.clone(), &client),
            guard: RouteGuard::new(store.clone(), shared.clone()),
            orchestrator: Arc::new(MatchOrchestrator::new(
                store.clone(),
                shared.clone(),
                shared.clone(),
            )),
            history: shared,
            store,
            client,
            config,
        }
    }

    pub fn history_view(&self) -> HistoryView {
        HistoryView::new(self.store.clone(), self.history.clone())
    }

    /// Model for a run: explicit choice, then the cached profile preference, then the default.
    pub fn select_model(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.store
                    .current()
                    .and_then(|s| s.profile)
                    .and_then(|p| p.model_preference)
                    .filter(|m| !m.trim().is_empty())
            })
            .unwrap_or_else(|| self.config.default_model.clone())
    }
}
