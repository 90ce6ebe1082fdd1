//! Client configuration.

use std::time::Duration;

/// Where the API lives and how often to poll it.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Base URL of the API server
    pub api_url: String,
    /// Delay before the first status request after submission
    pub initial_delay: Duration,
    /// Delay between subsequent status requests
    pub interval: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            initial_delay: Duration::from_millis(1500),
            interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl PollConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("EDUVID_API_URL").unwrap_or(defaults.api_url),
            initial_delay: std::env::var("EDUVID_POLL_INITIAL_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            interval: std::env::var("EDUVID_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            request_timeout: std::env::var("EDUVID_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}
