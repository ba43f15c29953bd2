//! Backend job API client
//!
//! Every kind exposes the same four project-scoped routes:
//!
//! - `POST /projects/{project}/{kind}/generate`
//! - `GET  /projects/{project}/{kind}/jobs/{job}`
//! - `GET  /projects/{project}/{kind}/jobs`
//! - `GET  /projects/{project}/{kind}/jobs/{job}/download?format=...`

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::models::generation::{GenerateRequest, JobListResponse, StartResponse};
use crate::models::job::{DownloadFormat, Job, JobKind};

/// Contract the tracking engine depends on.
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn start(
        &self,
        project_id: &str,
        kind: JobKind,
        request: &GenerateRequest,
    ) -> Result<StartResponse, ApiError>;

    async fn get_status(&self, project_id: &str, kind: JobKind, job_id: &str) -> Result<Job, ApiError>;

    async fn list(&self, project_id: &str, kind: JobKind) -> Result<Vec<Job>, ApiError>;

    /// Raw (unauthenticated) download URL for a job artifact.
    fn download_url(&self, project_id: &str, kind: JobKind, job_id: &str, format: DownloadFormat) -> String;
}

/// Build the download URL for a job artifact. Pure and deterministic.
pub fn build_download_url(
    base_url: &str,
    project_id: &str,
    kind: JobKind,
    job_id: &str,
    format: DownloadFormat,
) -> String {
    format!(
        "{}/projects/{}/{}/jobs/{}/download?format={}",
        base_url.trim_end_matches('/'),
        project_id,
        kind,
        job_id,
        format
    )
}

/// reqwest-backed implementation of [`JobApi`].
pub struct HttpJobApi {
    http: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct StartBody<'a> {
    source_id: &'a str,
    #[serde(flatten)]
    params: &'a serde_json::Map<String, serde_json::Value>,
}

impl HttpJobApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("genjob-tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn kind_url(&self, project_id: &str, kind: JobKind) -> String {
        format!("{}/projects/{}/{}", self.base_url, project_id, kind)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the body, keeping HTTP and decode failures apart.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(ApiError::Decode)
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn start(
        &self,
        project_id: &str,
        kind: JobKind,
        request: &GenerateRequest,
    ) -> Result<StartResponse, ApiError> {
        let source_id = request.source_id.as_deref().ok_or(ApiError::MissingSource)?;
        let body = StartBody {
            source_id,
            params: &request.params,
        };

        let url = format!("{}/generate", self.kind_url(project_id, kind));
        tracing::debug!(%url, "Starting generation job");

        self.send(self.http.post(&url).json(&body)).await
    }

    async fn get_status(&self, project_id: &str, kind: JobKind, job_id: &str) -> Result<Job, ApiError> {
        let url = format!("{}/jobs/{}", self.kind_url(project_id, kind), job_id);
        let mut job: Job = self.send(self.http.get(&url)).await?;
        job.kind = Some(kind);
        Ok(job)
    }

    async fn list(&self, project_id: &str, kind: JobKind) -> Result<Vec<Job>, ApiError> {
        let url = format!("{}/jobs", self.kind_url(project_id, kind));
        let response: JobListResponse = self.send(self.http.get(&url)).await?;

        if !response.success {
            return Err(ApiError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "job listing rejected".to_string()),
            ));
        }

        Ok(response
            .jobs
            .into_iter()
            .map(|mut job| {
                job.kind = Some(kind);
                job
            })
            .collect())
    }

    fn download_url(&self, project_id: &str, kind: JobKind, job_id: &str, format: DownloadFormat) -> String {
        build_download_url(&self.base_url, project_id, kind, job_id, format)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Backend rejected request: {0}")]
    Rejected(String),

    #[error("Generation request has no source id")]
    MissingSource,
}

impl ApiError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::Status { status, .. } => {
                *status >= 500 || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            ApiError::Decode(_) | ApiError::Rejected(_) | ApiError::MissingSource => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_is_deterministic() {
        let first = build_download_url("http://api/", "p1", JobKind::Presentation, "j1", DownloadFormat::Pptx);
        let second = build_download_url("http://api/", "p1", JobKind::Presentation, "j1", DownloadFormat::Pptx);
        assert_eq!(first, second);
        assert_eq!(first, "http://api/projects/p1/presentation/jobs/j1/download?format=pptx");
    }

    #[test]
    fn test_status_transience() {
        let unavailable = ApiError::Status { status: 503, body: String::new() };
        let throttled = ApiError::Status { status: 429, body: String::new() };
        let missing = ApiError::Status { status: 404, body: String::new() };
        assert!(unavailable.is_transient());
        assert!(throttled.is_transient());
        assert!(!missing.is_transient());
        assert!(!ApiError::Rejected("no".to_string()).is_transient());
    }
}
