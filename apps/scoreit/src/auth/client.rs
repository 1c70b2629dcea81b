//! Auth Client: register, login, Google login, email verification, password
//! management and account deletion.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::api_client::{ApiClient, ApiMessage};
use crate::errors::ClientError;

/// Successful login body. Older backends send only the token.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, name: &str, email: &str, password: &str)
        -> Result<ApiMessage, ClientError>;

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError>;

    async fn google_login(&self, access_token: &str) -> Result<LoginResponse, ClientError>;

    async fn verify_email(&self, verification_token: &str) -> Result<ApiMessage, ClientError>;

    async fn send_verification_email(&self, email: &str) -> Result<ApiMessage, ClientError>;

    async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<ApiMessage, ClientError>;

    async fn send_password_reset(&self, email: &str) -> Result<ApiMessage, ClientError>;

    async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<ApiMessage, ClientError>;

    async fn delete_account(&self, token: &str, password: &str) -> Result<ApiMessage, ClientError>;
}

/// Source of a Google OAuth access token. The popup/consent flow lives
/// outside the core; the core only consumes the resulting token.
#[async_trait]
pub trait GoogleTokenProvider: Send + Sync {
    async fn obtain_google_token(&self) -> Result<String, ClientError>;
}

/// Provider for an access token obtained out of band (CLI flag or env var).
pub struct StaticGoogleToken(pub String);

#[async_trait]
impl GoogleTokenProvider for StaticGoogleToken {
    async fn obtain_google_token(&self) -> Result<String, ClientError> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(ClientError::Validation(
                "Google access token is empty".to_string(),
            ));
        }
        Ok(token.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct GoogleBody<'a> {
    access_token: &'a str,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordBody<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordBody<'a> {
    token: &'a str,
    new_password: &'a str,
}

#[derive(Serialize)]
struct PasswordBody<'a> {
    password: &'a str,
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<ApiMessage, ClientError> {
        let body = RegisterBody {
            name,
            email,
            password,
        };
        self.send(self.request(Method::POST, "auth/register", None).json(&body))
            .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = CredentialsBody { email, password };
        self.send(self.request(Method::POST, "auth/login", None).json(&body))
            .await
    }

    async fn google_login(&self, access_token: &str) -> Result<LoginResponse, ClientError> {
        let body = GoogleBody { access_token };
        self.send(self.request(Method::POST, "auth/google", None).json(&body))
            .await
    }

    async fn verify_email(&self, verification_token: &str) -> Result<ApiMessage, ClientError> {
        self.send(
            self.request(Method::GET, "auth/verify_email", None)
                .query(&[("token", verification_token)]),
        )
        .await
    }

    async fn send_verification_email(&self, email: &str) -> Result<ApiMessage, ClientError> {
        self.send(
            self.request(Method::POST, "auth/send_email", None)
                .json(&EmailBody { email }),
        )
        .await
    }

    async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<ApiMessage, ClientError> {
        let body = ChangePasswordBody {
            old_password,
            new_password,
        };
        self.send(
            self.request(Method::POST, "password/change_password", Some(token))
                .json(&body),
        )
        .await
    }

    async fn send_password_reset(&self, email: &str) -> Result<ApiMessage, ClientError> {
        self.send(
            self.request(Method::POST, "password/send_reset_email", None)
                .json(&EmailBody { email }),
        )
        .await
    }

    async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<ApiMessage, ClientError> {
        let body = ResetPasswordBody {
            token: reset_token,
            new_password,
        };
        self.send(
            self.request(Method::POST, "password/reset_password", None)
                .json(&body),
        )
        .await
    }

    async fn delete_account(&self, token: &str, password: &str) -> Result<ApiMessage, ClientError> {
        self.send(
            self.request(Method::POST, "auth/delete", Some(token))
                .json(&PasswordBody { password }),
        )
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
    async fn test_login_posts_credentials_and_reads_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .match_body(Matcher::Json(json!({"email": "a@x.io", "password": "pw"})))
            .with_status(200)
            .with_body(r#"{"token": "jwt-1"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let response = client.login("a@x.io", "pw").await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.token, "jwt-1");
        assert!(response.name.is_none());
    }

    #[tokio::test]
    async fn test_login_invalid_credentials_is_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"error": "Invalid credentials"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let err = client.login("a@x.io", "bad").await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_change_password_uses_camel_case_fields_and_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/password/change_password")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({"oldPassword": "old", "newPassword": "new"})))
            .with_status(200)
            .with_body(r#"{"message": "Password updated successfully."}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        client.change_password("tok", "old", "new").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_verify_email_passes_token_as_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/auth/verify_email")
            .match_query(Matcher::UrlEncoded("token".into(), "v-123".into()))
            .with_status(200)
            .with_body(r#"{"message": "Email verified"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let ack = client.verify_email("v-123").await.unwrap();
        mock.assert_async().await;
        assert_eq!(ack.message.as_deref(), Some("Email verified"));
    }

    #[tokio::test]
    async fn test_static_google_token_rejects_blank() {
        let err = StaticGoogleToken("  ".to_string())
            .obtain_google_token()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
