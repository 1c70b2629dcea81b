use std::future::Future;

use thiserror::Error;
use tracing::warn;

use crate::errors::ClientError;
use crate::pipeline::stages::Stage;

/// Why a stage produced no result.
#[derive(Debug, Error)]
pub enum StageFailure {
    /// The request itself failed. Never retried.
    #[error("{0}")]
    Request(#[from] ClientError),

    /// Every attempt answered without a usable payload.
    #[error("no usable response after {attempts} attempt(s)")]
    EmptyPayload { attempts: u32 },
}

impl StageFailure {
    pub fn is_auth(&self) -> bool {
        matches!(self, StageFailure::Request(e) if e.is_auth())
    }

    pub fn user_message(&self) -> String {
        match self {
            StageFailure::Request(e) => e.user_message(),
            StageFailure::EmptyPayload { .. } => "The server returned no usable result.".to_string(),
        }
    }
}

/// Extra attempts granted to each stage after an unusable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub parse: u32,
    pub extract: u32,
    pub matching: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            parse: 0,
            extract: 1,
            matching: 0,
        }
    }
}

impl RetryPolicy {
    pub fn retries_for(&self, stage: Stage) -> u32 {
        match stage {
            Stage::ParseResume | Stage::ParseJd => self.parse,
            Stage::ExtractResume | Stage::ExtractJd => self.extract,
            Stage::Match => self.matching,
            Stage::Persist => 0,
        }
    }
}

/// Runs `call` until it yields `Some`, at most `retries + 1` times.
///
/// `Ok(None)` is an unusable response and consumes one attempt.
/// `Err` aborts immediately regardless of the remaining budget.
pub async fn with_retry<T, F, Fut>(stage: Stage, retries: u32, mut call: F) -> Result<T, StageFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ClientError>>,
{
    let attempts = retries + 1;
    for attempt in 1..=attempts {
        if let Some(value) = call().await? {
            return Ok(value);
        }
        if attempt < attempts {
            warn!(
                "{} attempt {}/{} returned no usable payload, retrying...",
                stage, attempt, attempts
            );
        }
    }
    warn!("{} gave up after {} attempt(s)", stage, attempts);
    Err(StageFailure::EmptyPayload { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_consumes_one_empty_response() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value = with_retry(Stage::ExtractResume, 1, move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ClientError>((n > 0).then_some("entities"))
        })
        .await
        .unwrap();
        assert_eq!(value, "entities");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_budget_exhausted_reports_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(Stage::ExtractJd, 1, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<()>, ClientError>(None)
        })
        .await;
        assert!(matches!(result, Err(StageFailure::EmptyPayload { attempts: 2 })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_request_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(Stage::ExtractResume, 1, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<Option<()>, _>(ClientError::Api {
                status: 500,
                message: "boom".into(),
            })
        })
        .await;
        assert!(matches!(result, Err(StageFailure::Request(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_policy_only_retries_extraction() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries_for(Stage::ParseResume), 0);
        assert_eq!(policy.retries_for(Stage::ParseJd), 0);
        assert_eq!(policy.retries_for(Stage::ExtractResume), 1);
        assert_eq!(policy.retries_for(Stage::ExtractJd), 1);
        assert_eq!(policy.retries_for(Stage::Match), 0);
    }
}
