use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Request-layer error type.
/// Every call to the ScoreIt backend returns `Result<T, ClientError>`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Error body shape used by every backend route: `{"error": ...}` or `{"message": ...}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ClientError {
    /// Maps a non-success HTTP status and its raw body to a `ClientError`.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
        let message = parsed
            .error
            .or(parsed.message)
            .unwrap_or_else(|| match body.trim() {
                "" => status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
                raw => raw.to_string(),
            });

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            _ => ClientError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// True for 401 responses: the token is invalid, expired or revoked.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport(_) => {
                "Could not reach the ScoreIt server. Check your connection.".to_string()
            }
            ClientError::Unauthorized(_) => "Your session has expired. Please log in again.".to_string(),
            ClientError::Validation(msg)
            | ClientError::NotFound(msg)
            | ClientError::Api { message: msg, .. } => msg.clone(),
            ClientError::Decode(_) => "The server sent an unexpected response.".to_string(),
        }
    }
}
