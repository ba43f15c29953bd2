//! Observable lifecycle state for one (project, kind) pair.

use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::watch;

use crate::models::job::Job;

/// Point-in-time view of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LifecycleState {
    /// Job being polled with live progress, if any.
    pub current_job: Option<Job>,
    /// Fully completed jobs, most recent first.
    pub finished_jobs: Vec<Job>,
    pub is_generating: bool,
}

/// Single source of truth views observe.
///
/// Readers take snapshots or subscribe; only the launcher, poller callbacks
/// and the resumption scanner write, hence the crate-private mutators.
#[derive(Debug)]
pub struct JobLifecycleStore {
    state: watch::Sender<LifecycleState>,
}

impl JobLifecycleStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::default());
        Self { state }
    }

    pub fn snapshot(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    pub fn current_job(&self) -> Option<Job> {
        self.state.borrow().current_job.clone()
    }

    pub fn finished_jobs(&self) -> Vec<Job> {
        self.state.borrow().finished_jobs.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.state.borrow().is_generating
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub(crate) fn set_current(&self, job: Option<Job>) {
        self.state.send_if_modified(|state| {
            if state.current_job == job {
                return false;
            }
            state.current_job = job;
            true
        });
    }

    /// Prepend a finished job. Returns false when a job with the same id is
    /// already recorded.
    pub(crate) fn record_finished(&self, job: Job) -> bool {
        self.state.send_if_modified(|state| {
            if state.finished_jobs.iter().any(|j| j.id == job.id) {
                return false;
            }
            state.finished_jobs.insert(0, job);
            true
        })
    }

    /// Rebuild the finished list wholesale after a full reload. Only the
    /// first entry for each id is kept.
    pub(crate) fn replace_finished(&self, jobs: Vec<Job>) {
        let mut seen = HashSet::new();
        let jobs: Vec<Job> = jobs
            .into_iter()
            .filter(|job| seen.insert(job.id.clone()))
            .collect();
        self.state.send_modify(|state| state.finished_jobs = jobs);
    }

    pub(crate) fn set_generating(&self, generating: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.is_generating != generating;
            state.is_generating = generating;
            changed
        });
    }
}

impl Default for JobLifecycleStore {
    fn default() -> Self {
        Self::new()
    }
}
