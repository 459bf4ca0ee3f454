//! Environment-driven configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Service-wide configuration loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Whether the background event poller runs at all.
    pub poller_enabled: bool,
    /// Base URL of this API; the poller polls its own /calendar/events/today.
    pub api_base_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    // Calendar provider
    pub nylas_api_key: Option<String>,
    pub nylas_grant_id: Option<String>,
    pub nylas_api_uri: String,
    pub calendar_id: Option<String>,

    // Supabase (profile store + realtime broadcast)
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub broadcast_topic: String,
    pub broadcast_event: String,

    // AI generator
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    /// User attributed when no request context is available (poller).
    pub default_user_id: Option<String>,
    /// Where the latest suggestion payload is written.
    pub suggestion_file: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let poller_enabled = std::env::var("ENABLE_EVENT_POLLER")
            .map(|v| v == "1")
            .unwrap_or(true);

        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

        let suggestion_file = std::env::var("SUGGESTION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("event_suggestions.json"));

        Self {
            poller_enabled,
            api_base_url,
            bind_addr,
            nylas_api_key: std::env::var("NYLAS_API_KEY").ok(),
            nylas_grant_id: std::env::var("NYLAS_GRANT_ID").ok(),
            nylas_api_uri: std::env::var("NYLAS_API_URI")
                .unwrap_or_else(|_| "https://api.us.nylas.com".to_string()),
            calendar_id: std::env::var("CALENDAR_ID").ok(),
            supabase_url: std::env::var("SUPABASE_URL").ok(),
            supabase_key: std::env::var("SUPABASE_KEY").ok(),
            broadcast_topic: std::env::var("SUPABASE_BROADCAST_TOPIC")
                .unwrap_or_else(|_| "event-changes".to_string()),
            broadcast_event: std::env::var("SUPABASE_BROADCAST_EVENT")
                .unwrap_or_else(|_| "shout".to_string()),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            default_user_id: std::env::var("DEFAULT_USER_ID").ok(),
            suggestion_file,
        }
    }
}

/// Timing parameters for the event poller. Fixed values, not env-driven;
/// tests construct their own with short intervals.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Base sleep between poll cycles.
    pub poll_interval: Duration,
    /// Upper bound of the uniform random jitter added to each sleep.
    pub max_jitter: Duration,
    /// Cap on backoff steps; sleep scales by 2^backoff.
    pub max_backoff_steps: u32,
    /// Micro-sleep when a tick finds the previous cycle still running.
    pub busy_retry: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_jitter: Duration::from_secs(1),
            max_backoff_steps: 4,
            busy_retry: Duration::from_millis(100),
        }
    }
}
