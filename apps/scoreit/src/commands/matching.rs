use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::warn;

use crate::cli::MatchArgs;
use crate::commands::history::preview;
use crate::commands::{friendly, require_authorized};
use crate::models::report::{MatchReport, ScoreBand};
use crate::pipeline::{JobSource, MatchError, MatchOutcome, MatchRequest, ResumeFile, ResumeSource};
use crate::state::AppState;

/// Local input checks run before the route guard so a bad file never costs a request.
pub async fn run(state: &AppState, args: MatchArgs) -> Result<()> {
    let request = build_request(args.resume_text, args.resume_file, args.jd_text, args.jd_link)?;
    request.validate().map_err(|e| anyhow!(e))?;
    require_authorized(state).await?;
    let model_id = state.select_model(args.model.as_deref());

    let outcome = state
        .orchestrator
        .run_with(&request, &model_id, |stage| println!("{}", stage.label()))
        .await
        .map_err(explain)?;

    println!();
    print_report(&outcome.report);
    println!(
        "\nCompleted in {:.1}s using model {model_id}.",
        outcome.elapsed_ms as f64 / 1000.0
    );
    if args.details {
        print_inputs(&outcome);
    }
    if let Some(e) = outcome.persist_error {
        println!("Note: {}", friendly(e.0));
        println!("The result above was not saved to your history.");
    }
    Ok(())
}

/// What the pipeline actually scored: the parsed texts and extracted entities.
fn print_inputs(outcome: &MatchOutcome) {
    println!("\nRésumé text:      {}", preview(&outcome.resume_text));
    println!("Job description:  {}", preview(&outcome.jd_text));
    println!("Résumé entities:  {}", entity_summary(&outcome.resume_entities));
    println!("JD entities:      {}", entity_summary(&outcome.jd_entities));
}

fn entity_summary(entities: &Value) -> String {
    match entities {
        Value::Object(map) => map.keys().cloned().collect::<Vec<_>>().join(", "),
        Value::Array(items) => format!("{} items", items.len()),
        other => preview(&other.to_string()),
    }
}

fn build_request(
    resume_text: Option<String>,
    resume_file: Option<std::path::PathBuf>,
    jd_text: Option<String>,
    jd_link: Option<String>,
) -> Result<MatchRequest> {
    let resume = match (resume_text, resume_file) {
        (_, Some(path)) => ResumeSource::UploadedFile(ResumeFile::from_path(&path).map_err(friendly)?),
        (Some(text), None) => ResumeSource::RawText(text),
        (None, None) => return Err(anyhow!("Provide --resume-text or --resume-file")),
    };
    let job = match (jd_text, jd_link) {
        (_, Some(link)) => JobSource::Link(link),
        (Some(text), None) => JobSource::RawText(text),
        (None, None) => return Err(anyhow!("Provide --jd-text or --jd-link")),
    };
    Ok(MatchRequest::new(resume, job))
}

fn explain(err: MatchError) -> anyhow::Error {
    if let Some(stage) = err.stage() {
        warn!(%stage, "Match run aborted");
    }
    match (&err, err.failure()) {
        (_, Some(failure)) if err.is_auth() => {
            anyhow!("{} Run `scoreit login` to continue.", failure.user_message())
        }
        (_, Some(failure)) => anyhow!("{err}\n  {}", failure.user_message()),
        (MatchError::NotAuthenticated, None) => {
            anyhow!("You are not logged in. Run `scoreit login` to continue.")
        }
        _ => anyhow!(err.to_string()),
    }
}

pub(crate) fn print_report(report: &MatchReport) {
    for (category, score) in report.categories() {
        println!(
            "  {:<16} {:>5.1}%  {}",
            category.label(),
            score * 100.0,
            band_label(ScoreBand::classify(score))
        );
    }
    let overall = report.overall();
    println!(
        "  {:<16} {:>5.1}%  {}",
        "Overall",
        overall * 100.0,
        band_label(ScoreBand::classify(overall))
    );
}

fn band_label(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Strong => "strong",
        ScoreBand::Good => "good",
        ScoreBand::Fair => "fair",
        ScoreBand::Weak => "weak",
    }
}
