//! Match history: request layer, timestamp normalization and the sorted view.

pub mod timestamp;
pub mod view;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::api_client::{ApiClient, ApiMessage};
use crate::errors::ClientError;
use crate::models::history::{HistoryEntry, NewHistoryEntry};

pub use view::HistoryView;

#[async_trait]
pub trait HistoryApi: Send + Sync {
    async fn add(&self, token: &str, entry: &NewHistoryEntry) -> Result<ApiMessage, ClientError>;

    /// All entries of the token's user, in backend order. No history is an empty list.
    async fn get_all(&self, token: &str) -> Result<Vec<HistoryEntry>, ClientError>;

    async fn delete_one(&self, token: &str, match_id: &str) -> Result<ApiMessage, ClientError>;

    async fn delete_all(&self, token: &str) -> Result<ApiMessage, ClientError>;
}

#[derive(Deserialize)]
struct HistoryList {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Serialize)]
struct DeleteOneBody<'a> {
    match_id: &'a str,
}

#[async_trait]
impl HistoryApi for ApiClient {
    async fn add(&self, token: &str, entry: &NewHistoryEntry) -> Result<ApiMessage, ClientError> {
        self.send(
            self.request(Method::POST, "history/add", Some(token))
                .json(entry),
        )
        .await
    }

    async fn get_all(&self, token: &str) -> Result<Vec<HistoryEntry>, ClientError> {
        let result: Result<HistoryList, ClientError> = self
            .send(self.request(Method::GET, "history/get_all", Some(token)))
            .await;
        match result {
            Ok(list) => Ok(list.history),
            // The backend answers 404 "No history found" for a user with no runs yet.
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn delete_one(&self, token: &str, match_id: &str) -> Result<ApiMessage, ClientError> {
        self.send(
            self.request(Method::DELETE, "history/delete_one", Some(token))
                .json(&DeleteOneBody { match_id }),
        )
        .await
    }

    async fn delete_all(&self, token: &str) -> Result<ApiMessage, ClientError> {
        self.send(self.request(Method::DELETE, "history/delete_all", Some(token)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::MatchReport;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_all_404_is_empty_history() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/history/get_all")
            .with_status(404)
            .with_body(r#"{"message": "No history found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        assert!(client.get_all("tok").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_reads_history_array() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/history/get_all")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(
                json!({"history": [
                    {"_id": {"$oid": "a1"}, "timestamp": {"$date": 1700000000000i64}},
                    {"_id": "b2", "timestamp": "1700000001000"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let entries = client.get_all("tok").await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2"]);
    }

    #[tokio::test]
    async fn test_add_sends_run_fields() {
        let mut server = Server::new_async().await;
        let report = MatchReport {
            education: 1.0,
            experience: 0.5,
            technical_skill: 0.5,
            soft_skill: 0.5,
            tool: 0.5,
            certification: 0.0,
            designation: 1.0,
        };
        let mock = server
            .mock("POST", "/history/add")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({
                "resume_text": "R",
                "jd_text": "J",
                "match_report": {"EDUCATION": 1.0, "DESIGNATION": 1.0}
            })))
            .with_status(200)
            .with_body(r#"{"message": "History added successfully", "history_id": "h1"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let entry = NewHistoryEntry {
            resume_text: "R".into(),
            resume_json: json!({"skills": ["rust"]}),
            jd_text: "J".into(),
            jd_json: json!({"skills": ["rust", "go"]}),
            match_report: report,
        };
        client.add("tok", &entry).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_one_sends_match_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/history/delete_one")
            .match_body(Matcher::Json(json!({"match_id": "a1"})))
            .with_status(200)
            .with_body(r#"{"message": "Match report deleted successfully"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        client.delete_one("tok", "a1").await.unwrap();
        mock.assert_async().await;
    }
}
