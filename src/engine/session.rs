//! Session controller owning one tracking engine per (project, kind).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::TrackerError;
use super::latch::GuardLatch;
use super::launcher::JobLauncher;
use super::poller::{JobPoller, PollSettings};
use super::resume::ResumptionScanner;
use super::store::JobLifecycleStore;
use crate::models::generation::GenerateRequest;
use crate::models::job::{DownloadFormat, Job, JobKind, KindProfile};
use crate::services::api::JobApi;
use crate::services::auth::AuthUrl;
use crate::services::notify::Notifier;

/// Everything needed to track one kind of job inside one project.
pub struct KindSession {
    project_id: String,
    profile: KindProfile,
    api: Arc<dyn JobApi>,
    auth: Arc<dyn AuthUrl>,
    store: Arc<JobLifecycleStore>,
    latch: GuardLatch,
    launcher: JobLauncher,
    scanner: ResumptionScanner,
    initialized: AtomicBool,
    cancel: CancellationToken,
}

impl KindSession {
    pub fn new(
        project_id: impl Into<String>,
        profile: KindProfile,
        api: Arc<dyn JobApi>,
        notifier: Arc<dyn Notifier>,
        auth: Arc<dyn AuthUrl>,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> Self {
        let project_id = project_id.into();
        let store = Arc::new(JobLifecycleStore::new());
        let latch = GuardLatch::new();
        let poller = JobPoller::new(Arc::clone(&api), settings);

        let launcher = JobLauncher::new(
            project_id.clone(),
            profile,
            poller.clone(),
            Arc::clone(&api),
            Arc::clone(&store),
            latch.clone(),
            Arc::clone(&notifier),
        );
        let scanner = ResumptionScanner::new(
            project_id.clone(),
            profile,
            poller,
            Arc::clone(&api),
            Arc::clone(&store),
            latch.clone(),
            notifier,
        );

        Self {
            project_id,
            profile,
            api,
            auth,
            store,
            latch,
            launcher,
            scanner,
            initialized: AtomicBool::new(false),
            cancel,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn profile(&self) -> KindProfile {
        self.profile
    }

    pub fn store(&self) -> &Arc<JobLifecycleStore> {
        &self.store
    }

    pub fn latch(&self) -> &GuardLatch {
        &self.latch
    }

    /// Kick off resumption in the background. Only the first call per
    /// session does anything; later calls return `None`.
    pub fn initialize(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return None;
        }
        let session = Arc::clone(self);
        Some(tokio::spawn(async move { session.resume().await }))
    }

    /// Reattach to whatever the backend still has in flight for this kind.
    pub async fn resume(&self) {
        self.scanner.resume(&self.cancel).await;
    }

    /// Start a generation and follow it to the end.
    pub async fn start(&self, request: &GenerateRequest) -> Result<Job, TrackerError> {
        self.launcher.start(request, &self.cancel).await
    }

    /// Reload the finished list from the backend.
    pub async fn refresh(&self) -> Result<Vec<Job>, TrackerError> {
        let jobs = self.scanner.reload().await?;
        Ok(jobs)
    }

    /// Authenticated download URL for a job artifact.
    pub fn download_url(&self, job_id: &str, format: Option<DownloadFormat>) -> String {
        let format = format.unwrap_or_else(|| self.profile.kind.default_format());
        let raw = self
            .api
            .download_url(&self.project_id, self.profile.kind, job_id, format);
        self.auth.authenticate(&raw)
    }

    /// Stop every poll this session started. The store keeps its last state.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Hands out one [`KindSession`] per (project, kind) and cancels them all on shutdown.
pub struct GenerationTracker {
    api: Arc<dyn JobApi>,
    notifier: Arc<dyn Notifier>,
    auth: Arc<dyn AuthUrl>,
    settings: PollSettings,
    sessions: Mutex<HashMap<(String, JobKind), Arc<KindSession>>>,
    cancel: CancellationToken,
}

impl GenerationTracker {
    pub fn new(
        api: Arc<dyn JobApi>,
        notifier: Arc<dyn Notifier>,
        auth: Arc<dyn AuthUrl>,
        settings: PollSettings,
    ) -> Self {
        Self {
            api,
            notifier,
            auth,
            settings,
            sessions: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// The session for `(project_id, profile.kind)`, created on first use.
    /// A session that was shut down is replaced by a fresh one.
    pub fn session(&self, project_id: &str, profile: impl Into<KindProfile>) -> Arc<KindSession> {
        let profile = profile.into();
        let key = (project_id.to_string(), profile.kind);

        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Session map mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };

        if let Some(existing) = sessions.get(&key) {
            if !existing.is_shut_down() {
                return Arc::clone(existing);
            }
        }

        let session = Arc::new(KindSession::new(
            project_id,
            profile,
            Arc::clone(&self.api),
            Arc::clone(&self.notifier),
            Arc::clone(&self.auth),
            self.settings,
            self.cancel.child_token(),
        ));
        sessions.insert(key, Arc::clone(&session));
        session
    }

    /// Get the session for a pair and start its one-time resumption.
    pub fn initialize(&self, project_id: &str, kind: JobKind) -> Arc<KindSession> {
        let session = self.session(project_id, kind);
        session.initialize();
        session
    }

    /// Cancel every poll in every session.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
