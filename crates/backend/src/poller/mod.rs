//! Background event poller.
//!
//! A single tokio task periodically re-fetches today's calendar events,
//! diffs them against the previous snapshot, and routes detected changes
//! into the AI suggestion pipeline. Fetch failures feed an exponential
//! backoff; nothing that happens inside a poll cycle can kill the loop.

pub mod describe;
pub mod diff;
pub mod dispatch;
pub mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use shared_types::SuggestionPayload;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::PollerConfig;
use crate::services::suggestions::SuggestionGenerator;
use diff::{diff_events, ChangeSet, Snapshot};
use dispatch::SuggestionSink;
use source::EventSource;

/// Resolves which user detected changes are attributed to.
pub trait UserResolver: Send + Sync {
    fn resolve_current_user(&self) -> anyhow::Result<String>;
}

impl UserResolver for crate::clients::supabase::SupabaseClient {
    fn resolve_current_user(&self) -> anyhow::Result<String> {
        Ok(self.current_user_id()?)
    }
}

/// State owned exclusively by the poller and mutated only from within a
/// guarded cycle.
#[derive(Default)]
struct PollerState {
    prev_events: Snapshot,
    backoff: u32,
}

struct PollerInner {
    config: PollerConfig,
    enabled: bool,
    source: Arc<dyn EventSource>,
    generator: Arc<dyn SuggestionGenerator>,
    sink: Arc<dyn SuggestionSink>,
    users: Arc<dyn UserResolver>,
    state: Mutex<PollerState>,
    /// Held for the duration of one poll cycle; ticks that find it taken
    /// skip instead of overlapping.
    cycle: Mutex<()>,
    running: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// The event poller. Cheap to clone handles are not needed; the process
/// entry point owns the single instance and calls `start`/`stop`.
pub struct EventPoller {
    inner: Arc<PollerInner>,
}

impl EventPoller {
    pub fn new(
        config: PollerConfig,
        enabled: bool,
        source: Arc<dyn EventSource>,
        generator: Arc<dyn SuggestionGenerator>,
        sink: Arc<dyn SuggestionSink>,
        users: Arc<dyn UserResolver>,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                config,
                enabled,
                source,
                generator,
                sink,
                users,
                state: Mutex::new(PollerState::default()),
                cycle: Mutex::new(()),
                running: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        }
    }

    /// Start the poll loop. No-op when polling is administratively disabled
    /// or the poller is already running.
    pub async fn start(&self) {
        if !self.inner.enabled {
            tracing::info!("Event poller disabled via ENABLE_EVENT_POLLER env var");
            return;
        }

        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Poller already running");
            return;
        }

        self.inner.source.connect().await;

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            poller_loop(inner).await;
        });
        *self.inner.task.lock().await = Some(handle);

        tracing::info!("Event poller started");
    }

    /// Stop the poll loop, cancelling any in-flight cycle and closing the
    /// network connection. No-op when already stopped.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        tracing::info!("Stopping event poller...");

        let handle = self.inner.task.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::error!("Poller task failed during shutdown: {e}"),
            }
        }

        // The aborted task has released the cycle guard by now; taking it
        // once makes sure stop() returns only after in-flight work ended.
        drop(self.inner.cycle.lock().await);

        self.inner.source.close().await;
        tracing::info!("Event poller stopped");
    }

    pub async fn is_running(&self) -> bool {
        if !self.inner.running.load(Ordering::SeqCst) {
            return false;
        }
        match self.inner.task.lock().await.as_ref() {
            Some(handle) => !handle.is_finished(),
            None => false,
        }
    }
}

async fn poller_loop(inner: Arc<PollerInner>) {
    while inner.running.load(Ordering::SeqCst) {
        // At most one poll cycle at a time; a busy tick is skipped, not
        // queued.
        match inner.cycle.try_lock() {
            Ok(_guard) => inner.poll_once().await,
            Err(_) => {
                tokio::time::sleep(inner.config.busy_retry).await;
                continue;
            }
        }

        let backoff = inner.state.lock().await.backoff;
        let base = inner.config.poll_interval * 2u32.pow(backoff);
        let jitter = std::time::Duration::from_secs_f64(
            rand::thread_rng().gen_range(0.0..=inner.config.max_jitter.as_secs_f64()),
        );
        let sleep_time = base + jitter;

        tracing::debug!(
            "Sleeping for {:.1}s (backoff: {})",
            sleep_time.as_secs_f64(),
            backoff
        );
        tokio::time::sleep(sleep_time).await;
    }
}

impl PollerInner {
    /// One poll cycle: fetch, diff, handle changes, replace the snapshot.
    /// Every failure is logged and swallowed.
    async fn poll_once(&self) {
        let events = match self.source.fetch_today_events().await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("Poll failed: {e}");
                let mut state = self.state.lock().await;
                state.backoff = (state.backoff + 1).min(self.config.max_backoff_steps);
                return;
            }
        };

        let prev = self.state.lock().await.prev_events.clone();
        let changes = diff_events(&prev, &events);

        if changes.has_changes() {
            tracing::info!(
                "Event changes detected at {}: {} added, {} updated, {} removed",
                Utc::now().to_rfc3339(),
                changes.added.len(),
                changes.updated.len(),
                changes.removed.len()
            );
            log_changes(&changes);
            self.handle_event_changes(&changes, &prev).await;
        } else {
            tracing::debug!("No event changes detected");
        }

        // Snapshot replaces the previous one on every successful poll,
        // whether or not changes were detected.
        let mut state = self.state.lock().await;
        state.backoff = 0;
        state.prev_events = changes.snapshot;
    }

    async fn handle_event_changes(&self, changes: &ChangeSet, prev: &Snapshot) {
        // The very first successful poll establishes the baseline; pure
        // additions from an empty prior state are not a real change.
        if prev.is_empty()
            && !changes.added.is_empty()
            && changes.updated.is_empty()
            && changes.removed.is_empty()
        {
            tracing::debug!("Initial event snapshot captured; skipping AI suggestions");
            return;
        }

        let descriptions = describe::build_change_descriptions(changes, prev);
        if descriptions.is_empty() {
            return;
        }

        let user_id = match self.users.resolve_current_user() {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::error!("Unable to resolve user for AI suggestions: {e}");
                return;
            }
        };

        // Generation runs on its own task so a slow model call does not sit
        // on the scheduler; the cycle still awaits the result.
        let generator = self.generator.clone();
        let gen_user = user_id.clone();
        let gen_descriptions = descriptions.clone();
        let suggestion = match tokio::spawn(async move {
            generator.generate(&gen_user, &gen_descriptions).await
        })
        .await
        {
            Ok(Ok(suggestion)) => suggestion,
            Ok(Err(e)) => {
                tracing::error!("AI suggestion generation failed: {e}");
                return;
            }
            Err(e) => {
                tracing::error!("AI suggestion task panicked: {e}");
                return;
            }
        };

        let payload = SuggestionPayload {
            user_id,
            generated_at: Utc::now(),
            changes: descriptions,
            suggestion,
        };

        if let Err(e) = self.sink.persist(&payload).await {
            tracing::error!("Failed to persist suggestion payload: {e}");
        }
    }
}

fn log_changes(changes: &ChangeSet) {
    for event in &changes.added {
        tracing::info!(
            "  + {} (ID: {})",
            event.title.as_deref().unwrap_or("Untitled"),
            event.id
        );
    }
    for event in &changes.updated {
        tracing::info!(
            "  ~ {} (ID: {})",
            event.title.as_deref().unwrap_or("Untitled"),
            event.id
        );
    }
    for event in &changes.removed {
        tracing::info!(
            "  - {} (ID: {})",
            event.title.as_deref().unwrap_or("Untitled"),
            event.id
        );
    }
}
