//! Reattach to jobs that were already running before this session began.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::error::{PollError, ResumptionError, TrackerError};
use super::latch::GuardLatch;
use super::poller::JobPoller;
use super::store::JobLifecycleStore;
use crate::models::job::{Completion, Job, KindProfile};
use crate::services::api::{ApiError, JobApi};
use crate::services::notify::Notifier;

pub struct ResumptionScanner {
    project_id: String,
    profile: KindProfile,
    api: Arc<dyn JobApi>,
    poller: JobPoller,
    store: Arc<JobLifecycleStore>,
    latch: GuardLatch,
    notifier: Arc<dyn Notifier>,
}

impl ResumptionScanner {
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

    /// Reload the job list and, if nothing is active, follow the first
    /// in-flight job to completion. Failures are logged, never notified.
    pub async fn resume(&self, cancel: &CancellationToken) {
        if let Err(e) = self.try_resume(cancel).await {
            tracing::warn!(
                project_id = %e.project_id,
                kind = %e.kind,
                error = %e.source,
                "Job resumption failed"
            );
        }
    }

    /// Fetch the job list and rebuild the finished list from it.
    /// Returns the full list for further inspection.
    pub async fn reload(&self) -> Result<Vec<Job>, ApiError> {
        let jobs = self.api.list(&self.project_id, self.profile.kind).await?;

        let finished: Vec<Job> = jobs
            .iter()
            .filter(|job| self.profile.rule.is_finished(job))
            .cloned()
            .collect();
        tracing::debug!(
            project_id = %self.project_id,
            kind = %self.profile.kind,
            total = jobs.len(),
            finished = finished.len(),
            "Job list loaded"
        );
        self.store.replace_finished(finished);

        Ok(jobs)
    }

    async fn try_resume(&self, cancel: &CancellationToken) -> Result<(), ResumptionError> {
        let kind = self.profile.kind;

        let jobs = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            jobs = self.reload() => jobs.map_err(|e| self.wrap(TrackerError::Api(e)))?,
        };

        if self.store.current_job().is_some() || self.store.is_generating() {
            tracing::debug!(project_id = %self.project_id, %kind, "Job already active, skipping resumption");
            return Ok(());
        }

        let Some(_guard) = self.latch.try_acquire() else {
            tracing::debug!(project_id = %self.project_id, %kind, "Resumption already running");
            return Ok(());
        };

        let Some(job) = jobs.into_iter().find(|job| self.profile.rule.is_in_flight(job)) else {
            return Ok(());
        };

        tracing::info!(
            project_id = %self.project_id,
            %kind,
            job_id = %job.id,
            status = ?job.status,
            "Resuming in-flight generation job"
        );
        metrics::counter!("generation_jobs_resumed_total", "kind" => kind.to_string()).increment(1);

        let job_id = job.id.clone();
        self.store.set_current(Some(job));
        self.store.set_generating(true);

        let store = Arc::clone(&self.store);
        let polled = self
            .poller
            .poll(&self.project_id, self.profile, &job_id, cancel, |snapshot| {
                store.set_current(Some(snapshot.clone()));
            })
            .await;

        if matches!(polled, Err(PollError::Cancelled)) {
            return Ok(());
        }

        self.store.set_current(None);
        self.store.set_generating(false);

        let job = polled.map_err(|e| self.wrap(TrackerError::Poll(e)))?;
        let failed = |source: TrackerError| {
            metrics::counter!("generation_jobs_failed_total", "kind" => kind.to_string()).increment(1);
            self.wrap(source)
        };
        match self.profile.rule.classify(&job) {
            Completion::Finished => {
                metrics::counter!("generation_jobs_completed_total", "kind" => kind.to_string())
                    .increment(1);
                tracing::info!(%job_id, %kind, "Resumed generation job finished");
                if self.store.record_finished(job) {
                    self.notifier.success(&format!("{} is ready", kind.label()));
                }
                Ok(())
            }
            Completion::Failed(message) => Err(failed(TrackerError::TerminalJob(message))),
            Completion::ExportFailed(message) => Err(failed(TrackerError::Export(message))),
            Completion::InFlight => Ok(()),
        }
    }

    fn wrap(&self, source: TrackerError) -> ResumptionError {
        ResumptionError {
            project_id: self.project_id.clone(),
            kind: self.profile.kind,
            source,
        }
    }
}
