//! Session Client: create/check/delete/delete-all against the backend's session table.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::api_client::{ApiClient, ApiMessage};
use crate::errors::ClientError;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub active: bool,
}

#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn create(&self, token: &str) -> Result<ApiMessage, ClientError>;
    async fn check(&self, token: &str) -> Result<SessionStatus, ClientError>;
    async fn delete(&self, token: &str) -> Result<ApiMessage, ClientError>;
    async fn delete_all(&self, token: &str) -> Result<ApiMessage, ClientError>;
}

#[async_trait]
impl SessionApi for ApiClient {
    async fn create(&self, token: &str) -> Result<ApiMessage, ClientError> {
        self.send(self.request(Method::POST, "session/create", Some(token)))
            .await
    }

    async fn check(&self, token: &str) -> Result<SessionStatus, ClientError> {
        self.send(self.request(Method::GET, "session/check", Some(token)))
            .await
    }

    async fn delete(&self, token: &str) -> Result<ApiMessage, ClientError> {
        self.send(self.request(Method::DELETE, "session/delete", Some(token)))
            .await
    }

    async fn delete_all(&self, token: &str) -> Result<ApiMessage, ClientError> {
        self.send(self.request(Method::DELETE, "session/delete_all", Some(token)))
            .await
    }
}
