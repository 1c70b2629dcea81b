use std::sync::Arc;

use tracing::{info, warn};

use crate::credentials::CredentialStore;
use crate::errors::ClientError;
use crate::history::timestamp::sort_newest_first;
use crate::history::HistoryApi;
use crate::models::history::HistoryEntry;

/// Locally held, newest-first copy of the user's history.
///
/// Deletions touch the local list only after the backend acknowledged them;
/// a failed delete leaves the list exactly as it was.
pub struct HistoryView {
    store: CredentialStore,
    api: Arc<dyn HistoryApi>,
    entries: Vec<HistoryEntry>,
}

impl HistoryView {
    pub fn new(store: CredentialStore, api: Arc<dyn HistoryApi>) -> Self {
        Self {
            store,
            api,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn refresh(&mut self) -> Result<&[HistoryEntry], ClientError> {
        let token = self.token()?;
        let result = self.api.get_all(&token).await;
        let fetched = self.on_auth_failure(result)?;
        self.entries = sort_newest_first(fetched);
        info!("Loaded {} history entries", self.entries.len());
        Ok(&self.entries)
    }

    pub async fn delete_one(&mut self, match_id: &str) -> Result<(), ClientError> {
        let token = self.token()?;
        let result = self.api.delete_one(&token, match_id).await;
        self.on_auth_failure(result)?;
        self.entries.retain(|e| e.id != match_id);
        Ok(())
    }

    pub async fn delete_all(&mut self) -> Result<(), ClientError> {
        let token = self.token()?;
        let result = self.api.delete_all(&token).await;
        self.on_auth_failure(result)?;
        self.entries.clear();
        Ok(())
    }

    fn token(&self) -> Result<String, ClientError> {
        self.store
            .token()
            .ok_or_else(|| ClientError::Unauthorized("You are not logged in".into()))
    }

    fn on_auth_failure<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(e) = &result {
            warn!("History request failed: {e}");
            if e.is_auth() {
                self.store.clear();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::ApiMessage;
    use crate::models::history::NewHistoryEntry;
    use crate::models::session::{Scope, UserInfo};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeHistory {
        entries: Vec<HistoryEntry>,
        fail_deletes: Option<u16>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeHistory {
        fn new(fail_deletes: Option<u16>) -> Arc<Self> {
            let entries = vec![
                json!({"_id": "old", "timestamp": 100}),
                json!({"_id": "new", "timestamp": {"$date": 300}}),
                json!({"_id": "mid", "timestamp": {"$date": {"$numberLong": "200"}}}),
            ]
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
            Arc::new(Self {
                entries,
                fail_deletes,
                deleted: Mutex::new(Vec::new()),
            })
        }

        fn failure(&self) -> Option<ClientError> {
            self.fail_deletes.map(|status| match status {
                401 => ClientError::Unauthorized("Invalid token".into()),
                status => ClientError::Api {
                    status,
                    message: "Failed to delete".into(),
                },
            })
        }
    }

    #[async_trait]
    impl HistoryApi for FakeHistory {
        async fn add(&self, _: &str, _: &NewHistoryEntry) -> Result<ApiMessage, ClientError> {
            Ok(ApiMessage::default())
        }

        async fn get_all(&self, _: &str) -> Result<Vec<HistoryEntry>, ClientError> {
            Ok(self.entries.clone())
        }

        async fn delete_one(&self, _: &str, match_id: &str) -> Result<ApiMessage, ClientError> {
            if let Some(e) = self.failure() {
                return Err(e);
            }
            self.deleted.lock().unwrap().push(match_id.to_string());
            Ok(ApiMessage::default())
        }

        async fn delete_all(&self, _: &str) -> Result<ApiMessage, ClientError> {
            if let Some(e) = self.failure() {
                return Err(e);
            }
            Ok(ApiMessage::default())
        }
    }

    fn logged_in() -> CredentialStore {
        let store = CredentialStore::in_memory();
        store.commit(
            "tok",
            Scope::Durable,
            UserInfo {
                name: "Ada".into(),
                email: "ada@x.io".into(),
                is_google_user: false,
            },
            None,
        );
        store
    }

    fn ids(view: &HistoryView) -> Vec<&str> {
        view.entries().iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_refresh_sorts_newest_first() {
        let mut view = HistoryView::new(logged_in(), FakeHistory::new(None));
        view.refresh().await.unwrap();
        assert_eq!(ids(&view), vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_delete_one_removes_after_ack() {
        let api = FakeHistory::new(None);
        let mut view = HistoryView::new(logged_in(), api.clone());
        view.refresh().await.unwrap();

        view.delete_one("mid").await.unwrap();
        assert_eq!(ids(&view), vec!["new", "old"]);
        assert_eq!(*api.deleted.lock().unwrap(), vec!["mid".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_list_unchanged() {
        let mut view = HistoryView::new(logged_in(), FakeHistory::new(Some(500)));
        view.refresh().await.unwrap();

        assert!(view.delete_one("mid").await.is_err());
        assert!(view.delete_all().await.is_err());
        assert_eq!(ids(&view), vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_delete_all_empties_list() {
        let mut view = HistoryView::new(logged_in(), FakeHistory::new(None));
        view.refresh().await.unwrap();
        view.delete_all().await.unwrap();
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_clears_session() {
        let store = logged_in();
        let mut view = HistoryView::new(store.clone(), FakeHistory::new(Some(401)));
        view.refresh().await.unwrap();

        assert!(view.delete_one("old").await.unwrap_err().is_auth());
        assert!(store.current().is_none());
        assert_eq!(view.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_without_session_makes_no_request() {
        let mut view = HistoryView::new(CredentialStore::in_memory(), FakeHistory::new(None));
        assert!(view.refresh().await.unwrap_err().is_auth());
        assert!(view.is_empty());
    }
}
