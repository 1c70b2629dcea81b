/// Match Orchestrator: drives one résumé/job match from raw inputs to a persisted report.
///
/// Stages run strictly in order: Parse-Resume (file input only), Parse-JD (link
/// input only), Extract-Resume, Extract-JD, Match, Persist. Every run ends in
/// exactly one terminal outcome: a `MatchOutcome` or a stage-tagged `MatchError`.
/// A Persist failure never hides a computed report; it rides along in
/// `MatchOutcome::persist_error`.
///
/// Only one run may be in flight per orchestrator. The in-flight flag is an RAII
/// guard, so a run that is dropped half-way (the caller gave up) frees it.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::credentials::CredentialStore;
use crate::errors::ClientError;
use crate::history::HistoryApi;
use crate::models::history::NewHistoryEntry;
use crate::models::report::MatchReport;
use crate::pipeline::retry::{with_retry, RetryPolicy, StageFailure};
use crate::pipeline::stages::{JobSource, MatchRequest, PipelineApi, ResumeSource, Stage};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("A match is already in progress")]
    InProgress,

    #[error("You are not logged in")]
    NotAuthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("Failed to parse resume: {0}")]
    ParseResumeFailed(StageFailure),

    #[error("Failed to parse job description: {0}")]
    ParseJdFailed(StageFailure),

    #[error("Failed to extract resume entities: {0}")]
    ExtractResumeFailed(StageFailure),

    #[error("Failed to extract job description entities: {0}")]
    ExtractJdFailed(StageFailure),

    #[error("Failed to generate match report: {0}")]
    MatchFailed(StageFailure),
}

impl MatchError {
    fn at(stage: Stage, failure: StageFailure) -> Self {
        match stage {
            Stage::ParseResume => MatchError::ParseResumeFailed(failure),
            Stage::ParseJd => MatchError::ParseJdFailed(failure),
            Stage::ExtractResume => MatchError::ExtractResumeFailed(failure),
            Stage::ExtractJd => MatchError::ExtractJdFailed(failure),
            // Persist failures never abort a run.
            Stage::Match | Stage::Persist => MatchError::MatchFailed(failure),
        }
    }

    /// The stage the run aborted at, if it got that far.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MatchError::ParseResumeFailed(_) => Some(Stage::ParseResume),
            MatchError::ParseJdFailed(_) => Some(Stage::ParseJd),
            MatchError::ExtractResumeFailed(_) => Some(Stage::ExtractResume),
            MatchError::ExtractJdFailed(_) => Some(Stage::ExtractJd),
            MatchError::MatchFailed(_) => Some(Stage::Match),
            MatchError::InProgress | MatchError::NotAuthenticated | MatchError::Validation(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            MatchError::ParseResumeFailed(f)
            | MatchError::ParseJdFailed(f)
            | MatchError::ExtractResumeFailed(f)
            | MatchError::ExtractJdFailed(f)
            | MatchError::MatchFailed(f) => Some(f),
            _ => None,
        }
    }

    /// True when the run ended because the session is gone; the caller should re-login.
    pub fn is_auth(&self) -> bool {
        matches!(self, MatchError::NotAuthenticated)
            || self.failure().map(StageFailure::is_auth).unwrap_or(false)
    }
}

/// The history write failed after a successful match.
#[derive(Debug, Error)]
#[error("Match report could not be saved to history: {0}")]
pub struct PersistFailure(#[from] pub ClientError);

#[derive(Debug)]
pub struct MatchOutcome {
    pub report: MatchReport,
    /// Wall-clock time from invocation to the Match stage's completion.
    pub elapsed_ms: u64,
    pub resume_text: String,
    pub jd_text: String,
    pub resume_entities: Value,
    pub jd_entities: Value,
    pub persist_error: Option<PersistFailure>,
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MatchOrchestrator {
    store: CredentialStore,
    api: Arc<dyn PipelineApi>,
    history: Arc<dyn HistoryApi>,
    policy: RetryPolicy,
    in_flight: AtomicBool,
}

impl MatchOrchestrator {
    pub fn new(store: CredentialStore, api: Arc<dyn PipelineApi>, history: Arc<dyn HistoryApi>) -> Self {
        Self::with_policy(store, api, history, RetryPolicy::default())
    }

    pub fn with_policy(
        store: CredentialStore,
        api: Arc<dyn PipelineApi>,
        history: Arc<dyn HistoryApi>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            api,
            history,
            policy,
            in_flight: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub async fn run(&self, request: &MatchRequest, model_id: &str) -> Result<MatchOutcome, MatchError> {
        self.run_with(request, model_id, |_| {}).await
    }

    /// Runs one match, reporting each stage to `on_stage` as it starts.
    pub async fn run_with(
        &self,
        request: &MatchRequest,
        model_id: &str,
        on_stage: impl FnMut(Stage) + Send,
    ) -> Result<MatchOutcome, MatchError> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            warn!("Match requested while another run is in flight; rejected");
            return Err(MatchError::InProgress);
        };

        request.validate().map_err(MatchError::Validation)?;
        let token = self.store.token().ok_or(MatchError::NotAuthenticated)?;

        let run_id = Uuid::new_v4();
        let span = info_span!("match_run", %run_id, model_id);
        let result = self
            .execute(request, model_id, &token, on_stage)
            .instrument(span)
            .await;

        if let Err(e) = &result {
            warn!(%run_id, "Match run failed: {e}");
            if e.is_auth() {
                info!("Backend rejected the session during a match; clearing local credentials");
                self.store.clear();
            }
        }
        result
    }

    async fn execute(
        &self,
        request: &MatchRequest,
        model_id: &str,
        token: &str,
        mut on_stage: impl FnMut(Stage) + Send,
    ) -> Result<MatchOutcome, MatchError> {
        let started = Instant::now();
        let api = self.api.as_ref();

        let resume_text = match &request.resume {
            ResumeSource::RawText(text) => text.clone(),
            ResumeSource::UploadedFile(file) => {
                self.enter(Stage::ParseResume, &mut on_stage);
                with_retry(Stage::ParseResume, self.policy.parse, move || async move {
                    api.parse_resume(token, file)
                        .await
                        .map(|body| usable_text(body.resume_text))
                })
                .await
                .map_err(|f| MatchError::at(Stage::ParseResume, f))?
            }
        };

        let jd_text = match &request.job {
            JobSource::RawText(text) => text.clone(),
            JobSource::Link(link) => {
                self.enter(Stage::ParseJd, &mut on_stage);
                with_retry(Stage::ParseJd, self.policy.parse, move || async move {
                    api.parse_jd(token, link)
                        .await
                        .map(|body| usable_text(body.jd_text))
                })
                .await
                .map_err(|f| MatchError::at(Stage::ParseJd, f))?
            }
        };

        if resume_text.trim().is_empty() || jd_text.trim().is_empty() {
            return Err(MatchError::Validation(
                "Both resume and job description must contain text.".to_string(),
            ));
        }

        self.enter(Stage::ExtractResume, &mut on_stage);
        let resume_ref = resume_text.as_str();
        let resume_entities = with_retry(Stage::ExtractResume, self.policy.extract, move || async move {
            api.extract_resume(token, resume_ref, model_id)
                .await
                .map(|body| usable_entities(body.entities))
        })
        .await
        .map_err(|f| MatchError::at(Stage::ExtractResume, f))?;

        self.enter(Stage::ExtractJd, &mut on_stage);
        let jd_ref = jd_text.as_str();
        let jd_entities = with_retry(Stage::ExtractJd, self.policy.extract, move || async move {
            api.extract_jd(token, jd_ref, model_id)
                .await
                .map(|body| usable_entities(body.entities))
        })
        .await
        .map_err(|f| MatchError::at(Stage::ExtractJd, f))?;

        self.enter(Stage::Match, &mut on_stage);
        let (resume_json, jd_json) = (&resume_entities, &jd_entities);
        let report = with_retry(Stage::Match, self.policy.matching, move || async move {
            api.make_match(token, resume_json, jd_json)
                .await
                .map(|body| usable_report(body.match_report))
        })
        .await
        .map_err(|f| MatchError::at(Stage::Match, f))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "Match complete in {}ms (overall {:.2})",
            elapsed_ms,
            report.overall()
        );

        self.enter(Stage::Persist, &mut on_stage);
        let entry = NewHistoryEntry {
            resume_text: resume_text.clone(),
            resume_json: resume_entities.clone(),
            jd_text: jd_text.clone(),
            jd_json: jd_entities.clone(),
            match_report: report,
        };
        let persist_error = self.persist(&entry).await.err();

        Ok(MatchOutcome {
            report,
            elapsed_ms,
            resume_text,
            jd_text,
            resume_entities,
            jd_entities,
            persist_error,
        })
    }

    fn enter(&self, stage: Stage, on_stage: &mut impl FnMut(Stage)) {
        info!("{}", stage.label());
        on_stage(stage);
    }

    async fn persist(&self, entry: &NewHistoryEntry) -> Result<(), PersistFailure> {
        let token = self
            .store
            .token()
            .ok_or_else(|| ClientError::Unauthorized("You are not logged in".into()))?;
        match self.history.add(&token, entry).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Failed to save match to history: {e}");
                if e.is_auth() {
                    self.store.clear();
                }
                Err(PersistFailure(e))
            }
        }
    }
}

fn usable_text(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

fn usable_entities(entities: Option<Value>) -> Option<Value> {
    entities.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    })
}

fn usable_report(raw: Option<Value>) -> Option<MatchReport> {
    let report: MatchReport = serde_json::from_value(raw?).ok()?;
    report.is_valid().then_some(report)
}
