use anyhow::Result;
use tracing::warn;

use crate::auth::client::StaticGoogleToken;
use crate::commands::{confirm, friendly, require_authorized, value_or_prompt, Mode};
use crate::models::session::{Scope, Session};
use crate::state::AppState;

pub async fn register(state: &AppState, name: &str, email: &str, password: Option<String>) -> Result<()> {
    let password = value_or_prompt(password, "Password")?;
    let message = state
        .auth
        .register(name, email, &password)
        .await
        .map_err(friendly)?;
    println!("{message}");
    Ok(())
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<()> {
    let message = state.auth.verify_email(token).await.map_err(friendly)?;
    println!("{message}");
    Ok(())
}

pub async fn resend_verification(state: &AppState, email: &str) -> Result<()> {
    let message = state.auth.resend_verification(email).await.map_err(friendly)?;
    println!("{message}");
    Ok(())
}

pub async fn login(
    state: &AppState,
    email: &str,
    password: Option<String>,
    remember: bool,
    mode: Mode,
) -> Result<()> {
    let password = value_or_prompt(password, "Password")?;
    let scope = Scope::from_remember_me(remember);
    let session = state
        .auth
        .login(email, &password, scope)
        .await
        .map_err(friendly)?;
    print_welcome(&session, mode);
    Ok(())
}

pub async fn google_login(
    state: &AppState,
    access_token: Option<String>,
    remember: bool,
    mode: Mode,
) -> Result<()> {
    let access_token = access_token
        .or_else(|| std::env::var("GOOGLE_ACCESS_TOKEN").ok())
        .unwrap_or_default();
    let provider = StaticGoogleToken(access_token);
    let session = state
        .auth
        .google_login(&provider, Scope::from_remember_me(remember))
        .await
        .map_err(friendly)?;
    print_welcome(&session, mode);
    Ok(())
}

fn print_welcome(session: &Session, mode: Mode) {
    println!("Welcome, {}!", session.user.name);
    if session.scope == Scope::Ephemeral && mode == Mode::OneShot {
        warn!("Ephemeral login outside the shell");
        println!(
            "Note: without --remember this session ends when the command exits. \
             Use --remember or `scoreit shell` to stay logged in."
        );
    }
}

pub async fn logout(state: &AppState) -> Result<()> {
    state.auth.logout().await;
    println!("Logged out.");
    Ok(())
}

pub async fn logout_all(state: &AppState) -> Result<()> {
    let result = state.auth.logout_everywhere().await;
    println!("Logged out on this device.");
    result.map_err(friendly)?;
    println!("All other sessions have been ended.");
    Ok(())
}

pub async fn forgot_password(state: &AppState, email: &str) -> Result<()> {
    let message = state.auth.send_password_reset(email).await.map_err(friendly)?;
    println!("{message}");
    Ok(())
}

pub async fn reset_password(state: &AppState, token: &str, password: Option<String>) -> Result<()> {
    let password = value_or_prompt(password, "New password")?;
    let message = state
        .auth
        .reset_password(token, &password)
        .await
        .map_err(friendly)?;
    println!("{message}");
    Ok(())
}

pub async fn change_password(state: &AppState, old: Option<String>, new: Option<String>) -> Result<()> {
    let old = value_or_prompt(old, "Current password")?;
    let new = value_or_prompt(new, "New password")?;
    let message = state
        .auth
        .change_password(&old, &new)
        .await
        .map_err(friendly)?;
    println!("{message}");
    Ok(())
}

pub async fn delete_account(state: &AppState, password: Option<String>, yes: bool) -> Result<()> {
    if !confirm("Delete your account, history and profile permanently?", yes)? {
        println!("Cancelled.");
        return Ok(());
    }
    let password = value_or_prompt(password, "Password")?;
    state.auth.delete_account(&password).await.map_err(friendly)?;
    println!("Your account has been deleted.");
    Ok(())
}

pub async fn whoami(state: &AppState) -> Result<()> {
    let session = require_authorized(state).await?;
    println!("{} <{}>", session.user.name, session.user.email);
    println!("  session: {} scope", session.scope);
    if session.user.is_google_user {
        println!("  signed in with Google");
    }
    Ok(())
}
