//! User-initiated generation: validate, start, poll to completion.

use garde::Validate;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{PollError, TrackerError};
use super::latch::GuardLatch;
use super::poller::JobPoller;
use super::store::JobLifecycleStore;
use crate::models::generation::GenerateRequest;
use crate::models::job::{Completion, Job, KindProfile};
use crate::services::api::JobApi;
use crate::services::notify::Notifier;

pub struct JobLauncher {
    project_id: String,
    profile: KindProfile,
    api: Arc<dyn JobApi>,
    poller: JobPoller,
    store: Arc<JobLifecycleStore>,
    latch: GuardLatch,
    notifier: Arc<dyn Notifier>,
}

impl JobLauncher {
    pub fn new(
        project_id: impl Into<String>,
        profile: KindProfile,
        poller: JobPoller,
        api: Arc<dyn JobApi>,
        store: Arc<JobLifecycleStore>,
        latch: GuardLatch,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            profile,
            api,
            poller,
            store,
            latch,
            notifier,
        }
    }

    /// Start a generation job and track it until it is terminal.
    ///
    /// Every failure is surfaced through the notifier before it is returned.
    /// On cancellation the store is left untouched.
    pub async fn start(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<Job, TrackerError> {
        let kind = self.profile.kind;

        if let Err(report) = request.validate() {
            self.notifier.error("Please select a source before generating");
            return Err(TrackerError::Validation(report));
        }

        let Some(_guard) = self.latch.try_acquire() else {
            self.notifier
                .info(&format!("{} generation is already in progress", kind.label()));
            return Err(TrackerError::AlreadyGenerating(kind));
        };

        self.store.set_current(None);
        self.store.set_generating(true);

        let outcome = self.run(request, cancel).await;

        if matches!(outcome, Err(TrackerError::Poll(PollError::Cancelled))) {
            tracing::debug!(project_id = %self.project_id, %kind, "Generation tracking cancelled");
            return outcome;
        }

        self.store.set_current(None);
        self.store.set_generating(false);

        match &outcome {
            Ok(_) => self
                .notifier
                .success(&format!("{} is ready", kind.label())),
            Err(e) => {
                metrics::counter!("generation_jobs_failed_total", "kind" => kind.to_string())
                    .increment(1);
                self.notifier.error(&user_message(e));
            }
        }

        outcome
    }

    async fn run(&self, request: &GenerateRequest, cancel: &CancellationToken) -> Result<Job, TrackerError> {
        let kind = self.profile.kind;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled.into()),
            response = self.api.start(&self.project_id, kind, request) => response,
        };
        let response = response.map_err(|e| {
            tracing::error!(project_id = %self.project_id, %kind, error = %e, "Start request failed");
            e
        })?;

        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| format!("{} generation could not be started", kind.label()));
            tracing::warn!(project_id = %self.project_id, %kind, %message, "Backend rejected generation");
            return Err(TrackerError::Start(message));
        }

        let job_id = response
            .job_id
            .ok_or_else(|| TrackerError::Start("Backend did not return a job id".to_string()))?;

        metrics::counter!("generation_jobs_started_total", "kind" => kind.to_string()).increment(1);
        tracing::info!(project_id = %self.project_id, %kind, %job_id, "Generation job started");

        let started = Instant::now();
        let store = Arc::clone(&self.store);
        let job = self
            .poller
            .poll(&self.project_id, self.profile, &job_id, cancel, |snapshot| {
                store.set_current(Some(snapshot.clone()));
            })
            .await
            .map_err(|e| {
                if !matches!(e, PollError::Cancelled) {
                    tracing::error!(%job_id, %kind, error = %e, "Lost track of generation job");
                }
                e
            })?;

        match self.profile.rule.classify(&job) {
            Completion::Finished => {
                metrics::counter!("generation_jobs_completed_total", "kind" => kind.to_string())
                    .increment(1);
                metrics::histogram!("generation_job_duration_seconds", "kind" => kind.to_string())
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(%job_id, %kind, "Generation job finished");
                self.store.record_finished(job.clone());
                Ok(job)
            }
            Completion::Failed(message) => {
                tracing::warn!(%job_id, %kind, %message, "Backend reported generation failure");
                Err(TrackerError::TerminalJob(message))
            }
            Completion::ExportFailed(message) => {
                tracing::warn!(%job_id, %kind, %message, "Export failed after generation");
                Err(TrackerError::Export(message))
            }
            Completion::InFlight => Err(TrackerError::TerminalJob(format!(
                "Job {job_id} stopped reporting progress before finishing"
            ))),
        }
    }
}

/// Text shown to the user for a failed launch.
fn user_message(error: &TrackerError) -> String {
    match error {
        TrackerError::TerminalJob(message) => message.clone(),
        TrackerError::Export(message) => format!("Generation finished but export failed: {message}"),
        TrackerError::Poll(_) => "Lost contact with the generation job. Refresh to check its status.".to_string(),
        other => other.to_string(),
    }
}
