use garde::Validate;
use serde::{Deserialize, Serialize};

use super::job::Job;

/// Request to start a generation job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GenerateRequest {
    /// Source document the job generates from. Must be present.
    #[garde(required, length(min = 1, max = 200))]
    pub source_id: Option<String>,

    /// Kind-specific parameters, forwarded to the backend untouched.
    #[garde(skip)]
    #[serde(default, flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl GenerateRequest {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Response from `POST /projects/{project}/{kind}/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from `GET /projects/{project}/{kind}/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub success: bool,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub error: Option<String>,
}
