pub mod account;
pub mod history;
pub mod matching;
pub mod profile;
pub mod shell;

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Result};
use tracing::debug;

use crate::auth::guard::{DenyReason, GuardState};
use crate::cli::{Commands, HistoryAction, ProfileAction};
use crate::errors::ClientError;
use crate::models::session::Session;
use crate::state::AppState;

/// Whether the process keeps its Ephemeral scope alive between commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    OneShot,
    Interactive,
}

pub async fn dispatch(state: &AppState, command: Commands, mode: Mode) -> Result<()> {
    if is_protected(&command) {
        require_authorized(state).await?;
    }

    match command {
        Commands::Register {
            name,
            email,
            password,
        } => account::register(state, &name, &email, password).await,
        Commands::VerifyEmail { token } => account::verify_email(state, &token).await,
        Commands::ResendVerification { email } => account::resend_verification(state, &email).await,
        Commands::Login {
            email,
            password,
            remember,
        } => account::login(state, &email, password, remember, mode).await,
        Commands::GoogleLogin {
            access_token,
            remember,
        } => account::google_login(state, access_token, remember, mode).await,
        Commands::Logout => account::logout(state).await,
        Commands::LogoutAll => account::logout_all(state).await,
        Commands::ForgotPassword { email } => account::forgot_password(state, &email).await,
        Commands::ResetPassword { token, password } => {
            account::reset_password(state, &token, password).await
        }
        Commands::ChangePassword { old, new } => account::change_password(state, old, new).await,
        Commands::DeleteAccount { password, yes } => {
            account::delete_account(state, password, yes).await
        }
        Commands::Whoami => account::whoami(state).await,
        Commands::Profile { action } => match action {
            ProfileAction::Show => profile::show(state).await,
            ProfileAction::Set { dark_mode, model } => profile::set(state, dark_mode, model).await,
        },
        Commands::Models => profile::models(state).await,
        Commands::Match(args) => matching::run(state, args).await,
        Commands::History { action } => match action {
            HistoryAction::List { details } => history::list(state, details).await,
            HistoryAction::Delete { id } => history::delete(state, &id).await,
            HistoryAction::Clear { yes } => history::clear(state, yes).await,
        },
        // Started from `main`; only reachable from inside a running shell.
        Commands::Shell => bail!("Already in the ScoreIt shell"),
    }
}

/// Commands that sit behind the route guard. `whoami` and `match` run the
/// guard themselves, `match` only after its local input checks pass.
fn is_protected(command: &Commands) -> bool {
    matches!(
        command,
        Commands::ChangePassword { .. }
            | Commands::DeleteAccount { .. }
            | Commands::Profile { .. }
            | Commands::History { .. }
    )
}

/// Re-validates the stored session with the backend; every protected command pays one check.
pub(crate) async fn require_authorized(state: &AppState) -> Result<Session> {
    let outcome = state
        .guard
        .enter_with(|s| {
            if !s.is_terminal() {
                debug!("Checking session with the server...");
            }
        })
        .await;
    match outcome {
        GuardState::Authorized(session) => Ok(session),
        GuardState::Unauthorized(DenyReason::CheckFailed) => {
            bail!("Could not verify your session with the server. Try again later.")
        }
        GuardState::Unauthorized(_) | GuardState::Checking => {
            bail!("You are not logged in. Run `scoreit login` to continue.")
        }
    }
}

/// Turns a request-layer error into the message shown to the user.
pub(crate) fn friendly(err: ClientError) -> anyhow::Error {
    if err.is_auth() {
        return anyhow!("{} Run `scoreit login` to continue.", err.user_message());
    }
    anyhow!(err.user_message())
}

/// Uses `given` when present, otherwise reads one line from stdin.
pub(crate) fn value_or_prompt(given: Option<String>, label: &str) -> Result<String> {
    if let Some(value) = given {
        return Ok(value);
    }
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        bail!("{label} is required");
    }
    Ok(value)
}

pub(crate) fn confirm(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let answer = value_or_prompt(None, &format!("{question} [y/N]"))
        .unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
