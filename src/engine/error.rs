use std::time::Duration;

use crate::models::job::JobKind;
use crate::services::api::ApiError;

/// Why a poll ended without a terminal job snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Polling cancelled")]
    Cancelled,

    #[error("Gave up after {attempts} consecutive failed status requests: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: ApiError,
    },

    #[error("Job did not reach a terminal state within {0:?}")]
    TimedOut(Duration),

    #[error("Status request failed: {0}")]
    Api(#[source] ApiError),
}

/// Failures of a user-initiated generation.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Invalid generation request: {0}")]
    Validation(#[from] garde::Report),

    #[error("A {0} generation is already in progress")]
    AlreadyGenerating(JobKind),

    #[error("Generation could not be started: {0}")]
    Start(String),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Generation failed: {0}")]
    TerminalJob(String),

    #[error("Generated, but export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failure while reconnecting to a job from a previous session. Logged only.
#[derive(Debug, thiserror::Error)]
#[error("Resuming {kind} jobs for project {project_id} failed: {source}")]
pub struct ResumptionError {
    pub project_id: String,
    pub kind: JobKind,
    #[source]
    pub source: TrackerError,
}
