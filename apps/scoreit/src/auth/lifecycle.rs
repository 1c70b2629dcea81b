//! Session lifecycle flows: every path that creates or destroys the current session.
//!
//! Invariants kept here:
//! - Every login attempt clears both credential scopes before talking to the backend.
//! - A session is committed only after the backend has registered it (`session/create`).
//! - Logout always ends with both scopes cleared, whatever the backend says.
//! - An `AuthError` from any authenticated call clears the store, except on
//!   routes that also check a password: there a 401 clears the store only
//!   when `session/check` confirms the token itself is dead.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api_client::{ApiClient, ApiMessage};
use crate::auth::client::{AuthApi, GoogleTokenProvider, LoginResponse};
use crate::auth::profile::ProfileApi;
use crate::auth::session_client::SessionApi;
use crate::credentials::CredentialStore;
use crate::errors::ClientError;
use crate::history::HistoryApi;
use crate::models::session::{Profile, ProfileUpdate, Scope, Session, UserInfo};

#[derive(Clone)]
pub struct AuthFlow {
    store: CredentialStore,
    auth: Arc<dyn AuthApi>,
    sessions: Arc<dyn SessionApi>,
    profiles: Arc<dyn ProfileApi>,
    history: Arc<dyn HistoryApi>,
}

impl AuthFlow {
    pub fn new(
        store: CredentialStore,
        auth: Arc<dyn AuthApi>,
        sessions: Arc<dyn SessionApi>,
        profiles: Arc<dyn ProfileApi>,
        history: Arc<dyn HistoryApi>,
    ) -> Self {
        Self {
            store,
            auth,
            sessions,
            profiles,
            history,
        }
    }

    /// All request layers served by one HTTP client.
    pub fn from_client(store: CredentialStore, client: &ApiClient) -> Self {
        let client = Arc::new(client.clone());
        Self::new(store, client.clone(), client.clone(), client.clone(), client)
    }

    #[cfg(test)]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    // ────────────────────────────────────────────────────────────────────────
    // Account creation and verification
    // ────────────────────────────────────────────────────────────────────────

    /// Registers a new account and seeds its profile. Does not log in.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, ClientError> {
        require("Name", name)?;
        require_email(email)?;
        require("Password", password)?;

        let ack = self.auth.register(name.trim(), email.trim(), password).await?;
        info!("Registered account for {}", email.trim());

        if let Err(e) = self.profiles.create(email.trim()).await {
            warn!("Profile creation after registration failed: {e}");
        }
        Ok(message_or(ack, "Registration successful. Check your inbox to verify your email."))
    }

    pub async fn verify_email(&self, verification_token: &str) -> Result<String, ClientError> {
        require("Verification token", verification_token)?;
        let ack = self.auth.verify_email(verification_token.trim()).await?;
        Ok(message_or(ack, "Email verified."))
    }

    pub async fn resend_verification(&self, email: &str) -> Result<String, ClientError> {
        require_email(email)?;
        let ack = self.auth.send_verification_email(email.trim()).await?;
        Ok(message_or(ack, "Verification email sent."))
    }

    // ────────────────────────────────────────────────────────────────────────
    // Login
    // ────────────────────────────────────────────────────────────────────────

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        scope: Scope,
    ) -> Result<Session, ClientError> {
        require_email(email)?;
        require("Password", password)?;

        // A stale session from a previous user must not survive a failed attempt.
        self.store.clear();

        let response = self.auth.login(email.trim(), password).await?;
        self.establish(response, Some(email.trim()), false, scope)
            .await
    }

    pub async fn google_login(
        &self,
        provider: &dyn GoogleTokenProvider,
        scope: Scope,
    ) -> Result<Session, ClientError> {
        self.store.clear();

        let access_token = provider.obtain_google_token().await?;
        let response = self.auth.google_login(&access_token).await?;
        self.establish(response, None, true, scope).await
    }

    /// Registers the backend session, loads the profile, then commits.
    async fn establish(
        &self,
        response: LoginResponse,
        known_email: Option<&str>,
        is_google_user: bool,
        scope: Scope,
    ) -> Result<Session, ClientError> {
        let email = response
            .email
            .filter(|e| !e.trim().is_empty())
            .or_else(|| known_email.map(str::to_string))
            .ok_or_else(|| ClientError::Decode("login response did not include an email".into()))?;
        let name = response
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| display_name_from_email(&email));
        let user = UserInfo {
            name,
            email,
            is_google_user,
        };

        self.sessions.create(&response.token).await?;

        let profile = self.load_profile(&response.token, &user.email).await;
        self.store
            .commit(response.token.clone(), scope, user.clone(), profile.clone());

        info!("Logged in as {} ({scope} scope)", user.email);
        Ok(Session {
            token: response.token,
            scope,
            user,
            profile,
        })
    }

    /// Best effort: a missing profile is created with defaults, other failures leave no cache.
    async fn load_profile(&self, token: &str, email: &str) -> Option<Profile> {
        match self.profiles.read(token).await {
            Ok(profile) => Some(profile),
            Err(e) if e.is_not_found() => {
                if let Err(e) = self.profiles.create(email).await {
                    warn!("Could not create missing profile: {e}");
                }
                Some(Profile::default())
            }
            Err(e) => {
                warn!("Could not load profile: {e}");
                None
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Logout and account removal
    // ────────────────────────────────────────────────────────────────────────

    /// Ends this session. Always succeeds locally.
    pub async fn logout(&self) {
        if let Some(session) = self.store.current() {
            if let Err(e) = self.sessions.delete(&session.token).await {
                warn!("Backend session delete failed during logout: {e}");
            }
        }
        self.store.clear();
        info!("Logged out");
    }

    /// Ends every session of this user. Local credentials are cleared even
    /// when the backend call fails; that failure is still returned.
    pub async fn logout_everywhere(&self) -> Result<(), ClientError> {
        let result = match self.store.current() {
            Some(session) => self.sessions.delete_all(&session.token).await.map(|_| ()),
            None => Ok(()),
        };
        self.store.clear();
        info!("Logged out of all sessions");
        result
    }

    /// Deletes the account, then its history and profile, then local credentials.
    pub async fn delete_account(&self, password: &str) -> Result<(), ClientError> {
        require("Password", password)?;
        let session = self.require_session()?;

        let result = self.auth.delete_account(&session.token, password).await;
        self.on_credential_failure(&session.token, result).await?;

        if let Err(e) = self.history.delete_all(&session.token).await {
            warn!("History cleanup after account deletion failed: {e}");
        }
        if let Err(e) = self.profiles.delete(&session.token).await {
            warn!("Profile cleanup after account deletion failed: {e}");
        }
        self.store.clear();
        info!("Account {} deleted", session.user.email);
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Passwords
    // ────────────────────────────────────────────────────────────────────────

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<String, ClientError> {
        require("Current password", old_password)?;
        require("New password", new_password)?;
        let session = self.require_session()?;

        if session.user.is_google_user {
            return Err(ClientError::Validation(
                "Accounts signed in with Google have no password to change".into(),
            ));
        }
        if old_password == new_password {
            return Err(ClientError::Validation(
                "New password must differ from the current one".into(),
            ));
        }

        let result = self
            .auth
            .change_password(&session.token, old_password, new_password)
            .await;
        let ack = self.on_credential_failure(&session.token, result).await?;
        Ok(message_or(ack, "Password updated."))
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<String, ClientError> {
        require_email(email)?;
        let ack = self.auth.send_password_reset(email.trim()).await?;
        Ok(message_or(ack, "Reset password link sent."))
    }

    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<String, ClientError> {
        require("Reset token", reset_token)?;
        require("New password", new_password)?;
        let ack = self.auth.reset_password(reset_token.trim(), new_password).await?;
        Ok(message_or(ack, "Password reset successful."))
    }

    // ────────────────────────────────────────────────────────────────────────
    // Profile
    // ────────────────────────────────────────────────────────────────────────

    /// Reads the server profile and refreshes the cached copy.
    pub async fn refresh_profile(&self) -> Result<Profile, ClientError> {
        let session = self.require_session()?;
        let result = self.profiles.read(&session.token).await;
        let profile = self.on_auth_failure(result)?;
        self.store.update_profile(profile.clone());
        Ok(profile)
    }

    pub async fn update_preferences(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        let session = self.require_session()?;
        let result = self.profiles.update(&session.token, update).await;
        self.on_auth_failure(result)?;

        let profile = match self.profiles.read(&session.token).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("Could not re-read profile after update: {e}");
                update.apply_to(&session.profile.unwrap_or_default())
            }
        };
        self.store.update_profile(profile.clone());
        Ok(profile)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Helpers
    // ────────────────────────────────────────────────────────────────────────

    fn require_session(&self) -> Result<Session, ClientError> {
        self.store
            .current()
            .ok_or_else(|| ClientError::Unauthorized("You are not logged in".into()))
    }

    fn on_auth_failure<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(e) = &result {
            if e.is_auth() {
                info!("Token rejected by backend; clearing local credentials");
                self.store.clear();
            }
        }
        result
    }

    /// For routes that answer a wrong password with 401: the session is only
    /// dropped when the backend no longer recognises the token.
    async fn on_credential_failure<T>(
        &self,
        token: &str,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let message = match result {
            Err(ClientError::Unauthorized(message)) => message,
            other => return other,
        };
        match self.sessions.check(token).await {
            Ok(status) if status.active => {
                info!("Credential rejected but session still active: {message}");
                Err(ClientError::Validation(message))
            }
            Ok(_) => self.on_auth_failure(Err(ClientError::Unauthorized(message))),
            Err(e) if e.is_auth() => self.on_auth_failure(Err(ClientError::Unauthorized(message))),
            Err(e) => {
                warn!("Could not confirm session after 401: {e}");
                Err(ClientError::Api {
                    status: 401,
                    message,
                })
            }
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Same shape the backend enforces: something@something.tld
fn require_email(email: &str) -> Result<(), ClientError> {
    require("Email", email)?;
    let valid = email
        .trim()
        .split_once('@')
        .map(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        })
        .unwrap_or(false);
    if !valid {
        return Err(ClientError::Validation("Invalid email format".into()));
    }
    Ok(())
}

fn display_name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

fn message_or(ack: ApiMessage, fallback: &str) -> String {
    ack.message.unwrap_or_else(|| fallback.to_string())
}
