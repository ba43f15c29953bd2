use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::engine::{GenerationTracker, PollSettings};
use crate::services::{
    api::{ApiError, HttpJobApi},
    auth::QueryTokenAuth,
    notify::TracingNotifier,
};

/// Shared state for the command-line front end.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TrackerConfig>,
    pub tracker: Arc<GenerationTracker>,
}

impl AppState {
    pub fn new(config: TrackerConfig, tracker: GenerationTracker) -> Self {
        Self {
            config: Arc::new(config),
            tracker: Arc::new(tracker),
        }
    }

    /// Wire the HTTP client, log-backed notifier and token URL signer from config.
    pub fn from_config(config: TrackerConfig) -> Result<Self, ApiError> {
        let api = HttpJobApi::new(
            &config.api_base_url,
            config.api_token.clone(),
            config.request_timeout(),
        )?;

        let tracker = GenerationTracker::new(
            Arc::new(api),
            Arc::new(TracingNotifier),
            Arc::new(QueryTokenAuth::new(config.api_token.clone())),
            PollSettings::from(&config),
        );

        Ok(Self::new(config, tracker))
    }
}
