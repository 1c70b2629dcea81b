//! `scoreit shell`: a line loop that keeps this process (and with it the
//! Ephemeral credential scope) alive between commands.

use anyhow::Result;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};

use crate::cli::{split_line, ShellLine};
use crate::commands::{dispatch, Mode};
use crate::models::session::Scope;
use crate::state::AppState;

pub async fn run(state: &AppState) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    info!("Shell started");
    println!("ScoreIt shell. Type `help` for commands, `exit` to quit.");
    if let Some(session) = state.store.current() {
        println!("Logged in as {} ({} scope).", session.user.email, session.scope);
    }

    loop {
        match rl.readline("scoreit> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "exit" || trimmed == "quit" {
                    break;
                }
                let _ = rl.add_history_entry(trimmed);

                let args = match split_line(trimmed) {
                    Ok(args) => args,
                    Err(e) => {
                        eprintln!("Error: {e}");
                        continue;
                    }
                };
                let parsed = match ShellLine::try_parse_from(args) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        // Covers `help` and `--help` too.
                        let _ = e.print();
                        continue;
                    }
                };

                if let Err(e) = dispatch(state, parsed.command, Mode::Interactive).await {
                    eprintln!("Error: {e:#}");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C detected. Type `exit` to quit.");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                debug!("Readline failed: {e:?}");
                return Err(e.into());
            }
        }
    }

    if let Some(session) = state.store.current() {
        if session.scope == Scope::Ephemeral {
            println!("Your session ends now; log in with --remember to stay logged in.");
        }
    }
    info!("Shell exited");
    Ok(())
}
