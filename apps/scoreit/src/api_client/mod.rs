/// API Client: the single point of entry for all HTTP calls to the ScoreIt backend.
///
/// ARCHITECTURAL RULE: No other module may build a `reqwest::Client`.
/// The auth, session, profile, pipeline and history request layers are all
/// `impl` blocks on `ApiClient` that go through `request` + `send` below, so
/// the bearer credential and the status mapping are applied identically everywhere.
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::errors::ClientError;

/// Plain acknowledgement body returned by most mutating routes.
#[derive(Debug, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

/// One entry of the backend's scoring-model catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOption {
    pub id: String,
    pub name: String,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Starts a request against `path`, attaching the bearer credential when given.
    pub(crate) fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and decodes a successful JSON body into `T`.
    /// Non-2xx statuses are mapped through `ClientError::from_status`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            debug!("{} returned {}", url, status);
            return Err(ClientError::from_status(status, &body));
        }

        debug!("{} returned {} ({} bytes)", url, status, body.len());

        // Some acknowledgement routes answer with an empty body.
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| ClientError::Decode(format!("{url}: {e}")))
    }

    /// GET /get_model_config: the backend's model id → display name catalogue.
    pub async fn fetch_model_config(&self) -> Result<Vec<ModelOption>, ClientError> {
        let raw: std::collections::HashMap<String, String> = self
            .send(self.request(Method::GET, "get_model_config", None))
            .await?;
        Ok(sort_models(raw))
    }
}

/// Orders models by numeric id when possible ("2" before "10"), then lexically.
fn sort_models(raw: std::collections::HashMap<String, String>) -> Vec<ModelOption> {
    let mut models: Vec<ModelOption> = raw
        .into_iter()
        .map(|(id, name)| ModelOption { id, name })
        .collect();
    models.sort_by(|a, b| {
        match (a.id.parse::<u64>(), b.id.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => a.id.cmp(&b.id),
        }
    });
    models
}
