use anyhow::Result;

use crate::commands::matching::print_report;
use crate::commands::{confirm, friendly};
use crate::state::AppState;

pub async fn list(state: &AppState, details: bool) -> Result<()> {
    let mut view = state.history_view();
    view.refresh().await.map_err(friendly)?;
    if view.is_empty() {
        println!("No past matches yet.");
        return Ok(());
    }

    for entry in view.entries() {
        let overall = entry
            .report()
            .map(|r| format!("{:>5.1}%", r.overall() * 100.0))
            .unwrap_or_else(|| "  n/a".to_string());
        println!("{}  {}  {}  {}", entry.id, entry.display_date(), overall, preview(&entry.jd_text));
        if details {
            if let Some(report) = entry.report() {
                print_report(&report);
            }
            println!();
        }
    }
    Ok(())
}

pub async fn delete(state: &AppState, id: &str) -> Result<()> {
    let mut view = state.history_view();
    view.delete_one(id).await.map_err(friendly)?;
    println!("Deleted {id}.");
    Ok(())
}

pub async fn clear(state: &AppState, yes: bool) -> Result<()> {
    if !confirm("Delete your entire match history?", yes)? {
        println!("Cancelled.");
        return Ok(());
    }
    let mut view = state.history_view();
    view.delete_all().await.map_err(friendly)?;
    println!("History cleared.");
    Ok(())
}

pub(crate) fn preview(text: &str) -> String {
    const WIDTH: usize = 48;
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= WIDTH {
        return line;
    }
    let cut: String = line.chars().take(WIDTH - 3).collect();
    format!("{cut}...")
}
