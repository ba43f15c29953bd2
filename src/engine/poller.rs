//! Status polling until a job reaches its kind's terminal state.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use super::error::PollError;
use crate::config::TrackerConfig;
use crate::models::job::{Job, KindProfile};
use crate::services::api::JobApi;

/// Timing and retry bounds for a poll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_consecutive_failures: u32,
    pub backoff_max: Duration,
    pub max_duration: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_consecutive_failures: 5,
            backoff_max: Duration::from_secs(30),
            max_duration: Duration::from_secs(30 * 60),
        }
    }
}

impl From<&TrackerConfig> for PollSettings {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_consecutive_failures: config.poll_max_consecutive_failures,
            backoff_max: config.poll_backoff_max(),
            max_duration: config.poll_max_duration(),
        }
    }
}

impl PollSettings {
    /// Delay after the `failures`-th consecutive transient failure.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.min(16);
        self.interval.saturating_mul(factor).min(self.backoff_max)
    }
}

#[derive(Clone)]
pub struct JobPoller {
    api: Arc<dyn JobApi>,
    settings: PollSettings,
}

impl JobPoller {
    pub fn new(api: Arc<dyn JobApi>, settings: PollSettings) -> Self {
        Self { api, settings }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Poll `job_id` until it is terminal under `profile.rule`.
    ///
    /// Every accepted snapshot goes to `on_snapshot`, in request order, even
    /// when nothing changed. Snapshots whose status would move backwards are
    /// dropped. Once `cancel` fires, no further callbacks are made.
    pub async fn poll<F>(
        &self,
        project_id: &str,
        profile: KindProfile,
        job_id: &str,
        cancel: &CancellationToken,
        mut on_snapshot: F,
    ) -> Result<Job, PollError>
    where
        F: FnMut(&Job) + Send,
    {
        let started = Instant::now();
        let deadline = started + self.settings.max_duration;
        let mut failures = 0u32;
        let mut last_rank = 0u8;

        loop {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = sleep_until(deadline) => return Err(self.timed_out(job_id, profile, started)),
                response = self.api.get_status(project_id, profile.kind, job_id) => response,
            };

            let delay = match response {
                Ok(job) => {
                    failures = 0;
                    let rank = job.status.rank();

                    if rank < last_rank {
                        tracing::warn!(
                            job_id,
                            status = ?job.status,
                            "Dropping stale status snapshot"
                        );
                    } else {
                        last_rank = rank;
                        if cancel.is_cancelled() {
                            return Err(PollError::Cancelled);
                        }
                        on_snapshot(&job);

                        if profile.rule.is_terminal(&job) {
                            tracing::debug!(
                                job_id,
                                status = ?job.status,
                                export_status = ?job.export_status,
                                "Job reached terminal state"
                            );
                            return Ok(job);
                        }
                    }
                    self.settings.interval
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    if failures > self.settings.max_consecutive_failures {
                        tracing::error!(job_id, error = %e, attempts = failures, "Status polling exhausted retries");
                        return Err(PollError::RetriesExhausted {
                            attempts: failures,
                            source: e,
                        });
                    }
                    let delay = self.settings.backoff_delay(failures);
                    tracing::warn!(
                        job_id,
                        error = %e,
                        attempt = failures,
                        retry_in_ms = delay.as_millis() as u64,
                        "Status request failed, backing off"
                    );
                    delay
                }
                Err(e) => return Err(PollError::Api(e)),
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = sleep_until(deadline) => return Err(self.timed_out(job_id, profile, started)),
                _ = sleep(delay) => {}
            }
        }
    }

    fn timed_out(&self, job_id: &str, profile: KindProfile, started: Instant) -> PollError {
        tracing::warn!(
            job_id,
            kind = %profile.kind,
            elapsed_secs = started.elapsed().as_secs(),
            "Job never reached a terminal state, giving up"
        );
        PollError::TimedOut(self.settings.max_duration)
    }
}
