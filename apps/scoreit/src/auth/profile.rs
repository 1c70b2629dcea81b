use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

use crate::api_client::{ApiClient, ApiMessage};
use crate::errors::ClientError;
use crate::models::session::{Profile, ProfileUpdate};

/// Server-owned user preferences.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn create(&self, email: &str) -> Result<ApiMessage, ClientError>;
    async fn read(&self, token: &str) -> Result<Profile, ClientError>;
    async fn update(&self, token: &str, update: &ProfileUpdate) -> Result<ApiMessage, ClientError>;
    async fn delete(&self, token: &str) -> Result<ApiMessage, ClientError>;
}

#[derive(Serialize)]
struct CreateBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    update_data: &'a ProfileUpdate,
}

#[async_trait]
impl ProfileApi for ApiClient {
    async fn create(&self, email: &str) -> Result<ApiMessage, ClientError> {
        self.send(
            self.request(Method::POST, "profile/create", None)
                .json(&CreateBody { email }),
        )
        .await
    }

    async fn read(&self, token: &str) -> Result<Profile, ClientError> {
        self.send(self.request(Method::GET, "profile/read", Some(token)))
            .await
    }

    async fn update(&self, token: &str, update: &ProfileUpdate) -> Result<ApiMessage, ClientError> {
        if update.is_empty() {
            return Err(ClientError::Validation("Nothing to update".to_string()));
        }
        self.send(
            self.request(Method::POST, "profile/update", Some(token))
                .json(&UpdateBody {
                    update_data: update,
                }),
        )
        .await
    }

    async fn delete(&self, token: &str) -> Result<ApiMessage, ClientError> {
        self.send(self.request(Method::DELETE, "profile/delete", Some(token)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_update_wraps_fields_in_update_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/profile/update")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({"update_data": {"model_preference": 2}})))
            .with_status(200)
            .with_body(r#"{"message": "Profile updated"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let update = ProfileUpdate {
            dark_mode: None,
            model_preference: Some("2".to_string()),
        };
        client.update("tok", &update).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected_before_request() {
        // No server: a request would fail with a transport error instead.
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1));
        let err = client
            .update("tok", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_read_missing_profile_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/profile/read")
            .with_status(404)
            .with_body(r#"{"error": "Profile not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        assert!(client.read("tok").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_read_decodes_stored_profile_document() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/profile/read")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(
                r#"{"_id": "665f1c2e9b1d4a0012ab34cd", "email": "a@b.co", "dark_mode": true, "model_preference": 3}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let profile = client.read("tok").await.unwrap();
        assert!(profile.dark_mode);
        assert_eq!(profile.model_preference.as_deref(), Some("3"));
    }
}
