//! Test doubles for the job API and notification sink

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use genjob_tracker::engine::{GenerationTracker, PollSettings};
use genjob_tracker::models::generation::{GenerateRequest, StartResponse};
use genjob_tracker::models::job::{DownloadFormat, Job, JobKind};
use genjob_tracker::services::api::{build_download_url, ApiError, JobApi};
use genjob_tracker::services::auth::QueryTokenAuth;
use genjob_tracker::services::notify::Notifier;

/// Job API that replays scripted responses.
///
/// Status scripts are consumed in order; once a script runs dry the last
/// successful snapshot is repeated.
#[derive(Default)]
pub struct ScriptedApi {
    start_response: Mutex<Option<StartResponse>>,
    list_response: Mutex<Vec<Job>>,
    list_fails: AtomicBool,
    statuses: Mutex<HashMap<String, VecDeque<Result<Job, ApiError>>>>,
    last_seen: Mutex<HashMap<String, Job>>,
    pub start_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub last_request: Mutex<Option<GenerateRequest>>,
    status_hook: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
    status_latency: Mutex<Option<Duration>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(self, response: StartResponse) -> Self {
        *self.start_response.lock().unwrap() = Some(response);
        self
    }

    pub fn with_list(self, jobs: Vec<Job>) -> Self {
        *self.list_response.lock().unwrap() = jobs;
        self
    }

    /// Every list request answers 503.
    pub fn with_failing_list(self) -> Self {
        self.list_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_statuses(self, job_id: &str, script: Vec<Result<Job, ApiError>>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(job_id.to_string(), script.into());
        self
    }

    /// Every status request takes `latency` before answering.
    pub fn with_status_latency(self, latency: Duration) -> Self {
        *self.status_latency.lock().unwrap() = Some(latency);
        self
    }

    /// Run `hook` at the start of every status request.
    pub fn on_status(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.status_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn status_requests(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn list_requests(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobApi for ScriptedApi {
    async fn start(
        &self,
        _project_id: &str,
        _kind: JobKind,
        request: &GenerateRequest,
    ) -> Result<StartResponse, ApiError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(self
            .start_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(StartResponse {
                success: false,
                job_id: None,
                error: None,
            }))
    }

    async fn get_status(&self, _project_id: &str, kind: JobKind, job_id: &str) -> Result<Job, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.status_hook.lock().unwrap().as_ref() {
            hook();
        }
        let latency = *self.status_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let next = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(|script| script.pop_front());

        match next {
            Some(Ok(mut job)) => {
                job.kind = Some(kind);
                self.last_seen
                    .lock()
                    .unwrap()
                    .insert(job_id.to_string(), job.clone());
                Ok(job)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last_seen
                .lock()
                .unwrap()
                .get(job_id)
                .cloned()
                .ok_or(ApiError::Status {
                    status: 404,
                    body: format!("no such job {job_id}"),
                }),
        }
    }

    async fn list(&self, _project_id: &str, _kind: JobKind) -> Result<Vec<Job>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.list_response.lock().unwrap().clone())
    }

    fn download_url(&self, project_id: &str, kind: JobKind, job_id: &str, format: DownloadFormat) -> String {
        build_download_url("http://backend.test", project_id, kind, job_id, format)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Success(String),
    Error(String),
    Info(String),
}

/// Notifier that remembers everything it was told.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.sent.lock().unwrap().push(Notification::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.sent.lock().unwrap().push(Notification::Error(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.sent.lock().unwrap().push(Notification::Info(message.to_string()));
    }
}

/// 503 from the backend; always retried.
pub fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        body: "upstream unavailable".to_string(),
    }
}

pub fn test_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_secs(2),
        max_consecutive_failures: 3,
        backoff_max: Duration::from_secs(8),
        max_duration: Duration::from_secs(120),
    }
}

pub fn tracker(api: Arc<ScriptedApi>, notifier: Arc<RecordingNotifier>) -> GenerationTracker {
    GenerationTracker::new(
        api,
        notifier,
        Arc::new(QueryTokenAuth::new(Some("session-token".to_string()))),
        test_settings(),
    )
}
