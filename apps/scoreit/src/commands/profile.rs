use anyhow::{bail, Result};
use tracing::warn;

use crate::commands::friendly;
use crate::models::session::ProfileUpdate;
use crate::state::AppState;

pub async fn show(state: &AppState) -> Result<()> {
    let profile = state.auth.refresh_profile().await.map_err(friendly)?;
    println!("Dark mode:        {}", if profile.dark_mode { "on" } else { "off" });
    println!(
        "Preferred model:  {}",
        profile
            .model_preference
            .as_deref()
            .unwrap_or("(backend default)")
    );
    Ok(())
}

pub async fn set(state: &AppState, dark_mode: Option<bool>, model: Option<String>) -> Result<()> {
    let model = model.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
    if let Some(id) = &model {
        match state.client.fetch_model_config().await {
            Ok(models) if !models.iter().any(|m| &m.id == id) => {
                bail!("Unknown model '{id}'. Run `scoreit models` to see the available ids.")
            }
            Ok(_) => {}
            Err(e) => warn!("Could not validate model id against the catalogue: {e}"),
        }
    }

    let update = ProfileUpdate {
        dark_mode,
        model_preference: model,
    };
    if update.is_empty() {
        bail!("Nothing to update: pass --dark-mode and/or --model");
    }

    let profile = state.auth.update_preferences(&update).await.map_err(friendly)?;
    println!(
        "Preferences saved (dark mode {}, model {}).",
        if profile.dark_mode { "on" } else { "off" },
        profile.model_preference.as_deref().unwrap_or("default")
    );
    Ok(())
}

pub async fn models(state: &AppState) -> Result<()> {
    let models = state.client.fetch_model_config().await.map_err(friendly)?;
    if models.is_empty() {
        println!("The server offers no scoring models.");
        return Ok(());
    }
    let selected = state.select_model(None);
    for model in models {
        let marker = if model.id == selected { "*" } else { " " };
        println!("{marker} {:>3}  {}", model.id, model.name);
    }
    Ok(())
}
