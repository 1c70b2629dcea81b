pub mod orchestrator;
pub mod retry;
pub mod stages;

pub use orchestrator::{MatchError, MatchOrchestrator, MatchOutcome};
pub use stages::{JobSource, MatchRequest, ResumeFile, ResumeSource};
