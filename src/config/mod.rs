use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Backend base URL (e.g., "https://api.example.com/v1")
    pub api_base_url: String,

    /// Session token sent as a bearer token and attached to download URLs
    #[serde(default)]
    pub api_token: Option<String>,

    /// Delay between status requests
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive transient failures tolerated before a poll gives up
    #[serde(default = "default_poll_max_consecutive_failures")]
    pub poll_max_consecutive_failures: u32,

    /// Upper bound on the backoff delay after a transient failure
    #[serde(default = "default_poll_backoff_max_ms")]
    pub poll_backoff_max_ms: u64,

    /// Hard limit on how long a single job is polled
    #[serde(default = "default_poll_max_duration_secs")]
    pub poll_max_duration_secs: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_poll_max_consecutive_failures() -> u32 {
    5
}

fn default_poll_backoff_max_ms() -> u64 {
    30_000
}

fn default_poll_max_duration_secs() -> u64 {
    30 * 60
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_backoff_max(&self) -> Duration {
        Duration::from_millis(self.poll_backoff_max_ms)
    }

    pub fn poll_max_duration(&self) -> Duration {
        Duration::from_secs(self.poll_max_duration_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
