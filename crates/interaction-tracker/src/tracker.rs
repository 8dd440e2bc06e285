//! The event tracker
//!
//! One cheaply cloneable handle owning the buffer, the snapshot writer, the
//! collector and the flush timer. `log_event` never blocks on I/O; storage
//! and network failures are logged and absorbed.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::buffer::EventBuffer;
use crate::collector::{is_success_status, Collector, FlushBatch, HttpCollector};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::event::{tap_data, EventData, InteractionEvent};
use crate::export::{export_events, ExportFormat};
use crate::flush::{FlightGuard, FlushOutcome, SkipReason};
use crate::persistence::{self, SnapshotWriter};
use crate::storage::{KeyValueStore, MemoryStore};

/// Builder for [`EventTracker`].
pub struct TrackerBuilder {
    config: TrackerConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    collector: Option<Arc<dyn Collector>>,
}

impl TrackerBuilder {
    /// Storage for the snapshot. Defaults to an in-memory store.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom collector instead of an HTTP collector built from
    /// `remote_endpoint`. Supplying one enables flushing and the timer.
    pub fn collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Restore the persisted snapshot and start the writer and flush timer.
    ///
    /// Must be awaited inside a Tokio runtime; background tasks run on it.
    pub async fn start(self) -> Result<EventTracker> {
        let config = self.config;
        config.validate()?;

        let runtime = Handle::try_current().map_err(|e| TrackerError::Runtime(e.to_string()))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);

        let restored = {
            let store = Arc::clone(&store);
            let key = config.storage_key.clone();
            tokio::task::spawn_blocking(move || persistence::restore(store.as_ref(), &key))
                .await
                .map_err(|e| TrackerError::Runtime(e.to_string()))?
        };

        let collector = match self.collector {
            Some(collector) => Some(collector),
            None => http_collector_for(&config)?,
        };

        let session_id = config
            .enable_anonymous_id
            .then(|| Uuid::new_v4().to_string());

        let writer = SnapshotWriter::spawn(&runtime, store, config.storage_key.clone());

        let mut buffer = EventBuffer::new();
        buffer.replace(restored);
        let restored_count = buffer.len();

        watch_screen_time(&config);

        let tracker = EventTracker {
            inner: Arc::new(Inner {
                runtime,
                config: RwLock::new(config),
                session_id,
                buffer: Mutex::new(buffer),
                writer,
                in_flight: AtomicBool::new(false),
                collector: RwLock::new(collector),
                timer: Mutex::new(None),
                reconfigure: Mutex::new(()),
            }),
        };
        tracker.install_timer();

        tracing::info!(
            "Interaction tracker started ({} restored events, remote {})",
            restored_count,
            if tracker.has_collector() { "enabled" } else { "disabled" }
        );
        Ok(tracker)
    }
}

/// Buffered interaction logger.
///
/// Clones share state. The flush timer stops when the last clone is dropped
/// or on [`shutdown`](Self::shutdown); queued snapshot writes still drain.
#[derive(Clone)]
pub struct EventTracker {
    inner: Arc<Inner>,
}

struct Inner {
    runtime: Handle,
    config: RwLock<TrackerConfig>,
    session_id: Option<String>,
    buffer: Mutex<EventBuffer>,
    writer: SnapshotWriter,
    in_flight: AtomicBool,
    collector: RwLock<Option<Arc<dyn Collector>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    reconfigure: Mutex<()>,
}

impl EventTracker {
    pub fn builder(config: TrackerConfig) -> TrackerBuilder {
        TrackerBuilder {
            config,
            store: None,
            collector: None,
        }
    }

    /// Start with the given store and an HTTP collector from the config.
    pub async fn start(config: TrackerConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::builder(config).store(store).start().await
    }

    /// Append an event and schedule a snapshot write.
    ///
    /// No validation is applied to `event_type` or `data`.
    pub fn log_event(&self, event_type: impl Into<String>, data: Option<EventData>) {
        let mut event = InteractionEvent::new(event_type);
        if let Some(data) = data {
            event = event.with_data(data);
        }
        if let Some(session_id) = &self.inner.session_id {
            event = event.with_session(session_id.clone());
        }
        tracing::debug!(event_type = %event.event_type, "Logged interaction event");

        let mut buffer = self.inner.buffer();
        buffer.push(event);
        self.inner.persist(&buffer);
    }

    /// A zero-argument callback that logs a `"tap"` event named `name`.
    pub fn track_tap(&self, name: impl Into<String>) -> impl Fn() + Send + Sync + 'static {
        let tracker = self.clone();
        let name = name.into();
        move || tracker.log_event("tap", Some(tap_data(&name)))
    }

    /// Serialize the current buffer. Never mutates it.
    pub fn export_logs(&self, format: ExportFormat) -> Result<String> {
        let buffer = self.inner.buffer();
        export_events(buffer.as_slice(), format)
    }

    /// Send the whole buffer to the collector.
    ///
    /// Only the events that were sent leave the buffer on success; events
    /// logged while the request was in flight stay buffered for the next
    /// flush. The snapshot is rewritten before this returns. Any failure
    /// leaves the buffer as it was.
    pub async fn flush(&self) -> FlushOutcome {
        let Some(collector) = self.inner.collector() else {
            return FlushOutcome::Skipped(SkipReason::NoEndpoint);
        };

        let Some(_guard) = FlightGuard::acquire(&self.inner.in_flight) else {
            tracing::debug!("Flush already in flight, skipping");
            return FlushOutcome::Skipped(SkipReason::InFlight);
        };

        let batch = {
            let buffer = self.inner.buffer();
            if buffer.is_empty() {
                return FlushOutcome::Empty;
            }
            FlushBatch {
                events: buffer.snapshot(),
            }
        };
        let count = batch.events.len();

        match collector.deliver(&batch).await {
            Ok(status) if is_success_status(status) => {
                {
                    let mut buffer = self.inner.buffer();
                    buffer.drain_delivered(count);
                    self.inner.persist(&buffer);
                }
                self.inner.writer.sync().await;
                tracing::info!("Flushed {} events (HTTP {})", count, status);
                FlushOutcome::Delivered { count }
            }
            Ok(status) => {
                tracing::warn!(
                    "Collector rejected {} events with HTTP {}, keeping them for the next flush",
                    count,
                    status
                );
                FlushOutcome::Rejected { status }
            }
            Err(e) => {
                tracing::warn!("Flush of {} events failed: {}, will retry next cycle", count, e);
                FlushOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Anonymous session id, when enabled.
    pub fn session_id(&self) -> Option<&str> {
        self.inner.session_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.inner.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.buffer().is_empty()
    }

    /// Copy of the buffered events in order.
    pub fn events(&self) -> Vec<InteractionEvent> {
        self.inner.buffer().snapshot()
    }

    pub fn config(&self) -> TrackerConfig {
        read(&self.inner.config).clone()
    }

    /// Wait until every snapshot write initiated so far has completed.
    pub async fn sync(&self) {
        self.inner.writer.sync().await;
    }

    /// Replace the endpoint and interval, rebuilding the HTTP collector and
    /// reinstalling the timer. A custom collector from the builder is
    /// replaced as well. `None` disables flushing.
    pub fn reconfigure_remote(
        &self,
        remote_endpoint: Option<String>,
        flush_interval_secs: u64,
    ) -> Result<()> {
        // Config, collector and timer change together or not at all.
        let _reconfiguring = lock(&self.inner.reconfigure);

        let mut next = self.config();
        next.remote_endpoint = remote_endpoint;
        next.flush_interval_secs = flush_interval_secs;
        next.validate()?;

        let collector = http_collector_for(&next)?;
        *write(&self.inner.config) = next;
        *write(&self.inner.collector) = collector;
        self.install_timer();
        Ok(())
    }

    /// Stop the flush timer. In-flight flushes and writes are not cancelled.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.inner.timer).take() {
            handle.abort();
            tracing::debug!("Flush timer stopped");
        }
    }

    fn has_collector(&self) -> bool {
        self.inner.collector().is_some()
    }

    fn install_timer(&self) {
        let mut slot = lock(&self.inner.timer);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        if !self.has_collector() {
            return;
        }

        let period = read(&self.inner.config).flush_interval();
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(self.inner.runtime.spawn(run_flush_timer(weak, period)));
        tracing::debug!("Flush timer installed every {:?}", period);
    }
}

impl fmt::Debug for EventTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTracker")
            .field("session_id", &self.inner.session_id)
            .field("buffered", &self.len())
            .field("remote", &self.has_collector())
            .finish()
    }
}

impl Inner {
    fn buffer(&self) -> MutexGuard<'_, EventBuffer> {
        lock(&self.buffer)
    }

    fn collector(&self) -> Option<Arc<dyn Collector>> {
        read(&self.collector).clone()
    }

    /// Serialize under the buffer lock so queue order matches buffer order.
    fn persist(&self, buffer: &EventBuffer) {
        match persistence::encode_snapshot(buffer.as_slice()) {
            Ok(snapshot) => self.writer.submit(snapshot),
            Err(e) => tracing::warn!("Failed to encode event snapshot: {}", e),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}

/// First tick one full period after installation; late ticks are not
/// caught up.
async fn run_flush_timer(inner: Weak<Inner>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let tracker = EventTracker { inner };
        let outcome = tracker.flush().await;
        tracing::trace!("Scheduled flush: {}", outcome);
    }
}

fn http_collector_for(config: &TrackerConfig) -> Result<Option<Arc<dyn Collector>>> {
    match config.endpoint() {
        Some(endpoint) => {
            let collector = HttpCollector::new(endpoint, config.request_timeout())?;
            Ok(Some(Arc::new(collector) as Arc<dyn Collector>))
        }
        None => Ok(None),
    }
}

fn watch_screen_time(config: &TrackerConfig) {
    if !config.auto_track_screen_time {
        return;
    }
    // Screen-time needs navigation lifecycle hooks from the host; none are wired.
    tracing::debug!("auto_track_screen_time is set but screen-time tracking is a no-op");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
