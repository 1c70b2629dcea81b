use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "scoreit")]
#[command(version, about = "ScoreIt client - score your resume against a job description", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Parser for one line typed into `scoreit shell` (no binary name).
#[derive(Parser, Debug)]
#[command(name = "scoreit", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account (does not log in)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Confirm an email address with the token from the verification mail
    VerifyEmail { token: String },
    /// Send the verification mail again
    ResendVerification { email: String },
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        /// Keep the session across restarts
        #[arg(long)]
        remember: bool,
    },
    /// Log in with a Google OAuth access token
    GoogleLogin {
        /// Falls back to the GOOGLE_ACCESS_TOKEN environment variable
        #[arg(long)]
        access_token: Option<String>,
        #[arg(long)]
        remember: bool,
    },
    /// End this session
    Logout,
    /// End every session of this account, on all devices
    LogoutAll,
    /// Mail a password reset link
    ForgotPassword { email: String },
    /// Set a new password with the token from the reset mail
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Change the password of the logged-in account
    ChangePassword {
        #[arg(long)]
        old: Option<String>,
        #[arg(long)]
        new: Option<String>,
    },
    /// Permanently delete the account, its history and its profile
    DeleteAccount {
        #[arg(long)]
        password: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show the logged-in user after re-validating the session
    Whoami,
    /// Show or change preferences
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// List the scoring models offered by the backend
    Models,
    /// Score a resume against a job description
    Match(MatchArgs),
    /// Browse or delete past matches
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Interactive session; a login without --remember lasts until exit
    Shell,
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    Show,
    Set {
        #[arg(long)]
        dark_mode: Option<bool>,
        /// Preferred scoring model id (see `scoreit models`)
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// Newest first
    List {
        /// Include the per-category scores
        #[arg(long)]
        details: bool,
    },
    Delete { id: String },
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    #[arg(long, conflicts_with = "resume_file", required_unless_present = "resume_file")]
    pub resume_text: Option<String>,
    /// PDF résumé
    #[arg(long)]
    pub resume_file: Option<PathBuf>,
    #[arg(long, conflicts_with = "jd_link", required_unless_present = "jd_link")]
    pub jd_text: Option<String>,
    /// URL of a job posting
    #[arg(long)]
    pub jd_link: Option<String>,
    /// Scoring model id; defaults to the profile preference
    #[arg(long)]
    pub model: Option<String>,
    /// Also show the parsed texts and extracted entities
    #[arg(long)]
    pub details: bool,
}

/// Splits a shell line into arguments, honouring single and double quotes.
pub fn split_line(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err("dangling escape".to_string()),
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, '\\') => match chars.next() {
                Some(escaped) => {
                    current.push(escaped);
                    in_word = true;
                }
                None => return Err("dangling escape".to_string()),
            },
            (None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}
