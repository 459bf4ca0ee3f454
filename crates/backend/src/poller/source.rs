//! Event fetching for the poller.
//!
//! The poller watches the service's own today-events endpoint rather than
//! the provider directly, so it sees exactly what API consumers see.

use async_trait::async_trait;
use shared_types::{EventRecord, EventsListResponse};
use thiserror::Error;
use tokio::sync::Mutex;

const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Fetch failure: network error or non-success status. Recovered locally by
/// the poller's backoff, never surfaced to callers.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("event fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("event endpoint returned {0}")]
    Status(reqwest::StatusCode),
}

/// Capability contract for retrieving today's events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open the underlying connection. Called once by `start()`.
    async fn connect(&self);

    /// Close the underlying connection. Called once by `stop()`.
    async fn close(&self);

    async fn fetch_today_events(&self) -> Result<Vec<EventRecord>, TransportError>;
}

/// HTTP event source with a persistent, self-healing client.
///
/// The client lives across calls; if it is found missing (after `close()`,
/// or before the first `connect()`), it is transparently recreated without
/// a caller-visible error.
pub struct HttpEventSource {
    base_url: String,
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpEventSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Mutex::new(None),
        }
    }

    fn build_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn connect(&self) {
        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = Some(Self::build_client());
        }
    }

    async fn close(&self) {
        self.client.lock().await.take();
    }

    async fn fetch_today_events(&self) -> Result<Vec<EventRecord>, TransportError> {
        let client = {
            let mut guard = self.client.lock().await;
            match guard.as_ref() {
                Some(client) => client.clone(),
                None => {
                    tracing::warn!("HTTP client is closed, recreating...");
                    let client = Self::build_client();
                    *guard = Some(client.clone());
                    client
                }
            }
        };

        let url = format!(
            "{}/calendar/events/today",
            self.base_url.trim_end_matches('/')
        );
        let response = client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        let body: EventsListResponse = response.json().await?;
        Ok(body.events)
    }
}
