//! UniFFI bindings for Swift/Kotlin hosts.
//!
//! The exported object owns its own Tokio runtime, so hosts call it from any
//! background thread without providing an executor.

use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::export::ExportFormat;
use crate::flush::{FlushOutcome, SkipReason};
use crate::storage::FileStore;
use crate::tracker::EventTracker;

/// FFI-safe error type
#[derive(uniffi::Error, thiserror::Error, Debug, Clone)]
#[uniffi(flat_error)]
pub enum FfiError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
    #[error("Storage error: {message}")]
    Storage { message: String },
    #[error("Runtime error: {message}")]
    Runtime { message: String },
}

impl From<TrackerError> for FfiError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::Storage(e) => FfiError::Storage {
                message: e.to_string(),
            },
            TrackerError::Runtime(message) => FfiError::Runtime { message },
            other => FfiError::InvalidInput {
                message: other.to_string(),
            },
        }
    }
}

/// Tracker options as passed by the host app
#[derive(uniffi::Record, Clone, Debug)]
pub struct FfiTrackerConfig {
    pub remote_endpoint: Option<String>,
    pub flush_interval_secs: u64,
    pub enable_anonymous_id: bool,
    pub auto_track_screen_time: bool,
}

impl From<FfiTrackerConfig> for TrackerConfig {
    fn from(config: FfiTrackerConfig) -> Self {
        TrackerConfig {
            remote_endpoint: config.remote_endpoint,
            flush_interval_secs: config.flush_interval_secs,
            enable_anonymous_id: config.enable_anonymous_id,
            auto_track_screen_time: config.auto_track_screen_time,
            ..TrackerConfig::default()
        }
    }
}

/// Default options: no endpoint, 60 second interval, no session id.
#[uniffi::export]
pub fn default_tracker_config() -> FfiTrackerConfig {
    let defaults = TrackerConfig::default();
    FfiTrackerConfig {
        remote_endpoint: defaults.remote_endpoint,
        flush_interval_secs: defaults.flush_interval_secs,
        enable_anonymous_id: defaults.enable_anonymous_id,
        auto_track_screen_time: defaults.auto_track_screen_time,
    }
}

#[derive(uniffi::Enum, Clone, Copy, Debug)]
pub enum FfiExportFormat {
    Json,
    Csv,
}

impl From<FfiExportFormat> for ExportFormat {
    fn from(format: FfiExportFormat) -> Self {
        match format {
            FfiExportFormat::Json => ExportFormat::Json,
            FfiExportFormat::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq)]
pub enum FfiFlushOutcome {
    NoEndpoint,
    InFlight,
    Empty,
    Delivered { count: u64 },
    Rejected { status: u16 },
    Failed { reason: String },
}

impl From<FlushOutcome> for FfiFlushOutcome {
    fn from(outcome: FlushOutcome) -> Self {
        match outcome {
            FlushOutcome::Skipped(SkipReason::NoEndpoint) => Self::NoEndpoint,
            FlushOutcome::Skipped(SkipReason::InFlight) => Self::InFlight,
            FlushOutcome::Empty => Self::Empty,
            FlushOutcome::Delivered { count } => Self::Delivered {
                count: count as u64,
            },
            FlushOutcome::Rejected { status } => Self::Rejected { status },
            FlushOutcome::Failed { reason } => Self::Failed { reason },
        }
    }
}

/// The main entry point for Swift/Kotlin.
#[derive(uniffi::Object)]
pub struct InteractionTracker {
    // Declared before the runtime so it drops first.
    tracker: EventTracker,
    runtime: tokio::runtime::Runtime,
}

#[uniffi::export]
impl InteractionTracker {
    /// Start a tracker persisting into `storage_dir`.
    #[uniffi::constructor]
    pub fn new(config: FfiTrackerConfig, storage_dir: String) -> Result<Arc<Self>, FfiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("interaction-tracker")
            .enable_all()
            .build()
            .map_err(|e| FfiError::Runtime {
                message: e.to_string(),
            })?;

        let store = FileStore::open(storage_dir).map_err(|e| FfiError::Storage {
            message: e.to_string(),
        })?;
        let tracker = runtime.block_on(EventTracker::start(config.into(), Arc::new(store)))?;

        Ok(Arc::new(Self { tracker, runtime }))
    }

    /// Log an event. `data_json`, when given, must be a JSON object.
    pub fn log_event(&self, event_type: String, data_json: Option<String>) -> Result<(), FfiError> {
        let data = match data_json {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| FfiError::InvalidInput {
                message: format!("data must be a JSON object: {}", e),
            })?),
            None => None,
        };
        self.tracker.log_event(event_type, data);
        Ok(())
    }

    /// Log a `"tap"` event named `name`.
    pub fn track_tap(&self, name: String) {
        (self.tracker.track_tap(name))();
    }

    pub fn export_logs(&self, format: FfiExportFormat) -> Result<String, FfiError> {
        Ok(self.tracker.export_logs(format.into())?)
    }

    /// Flush now, blocking the calling thread until the collector answers.
    pub fn flush(&self) -> FfiFlushOutcome {
        self.runtime.block_on(self.tracker.flush()).into()
    }

    pub fn session_id(&self) -> Option<String> {
        self.tracker.session_id().map(str::to_string)
    }

    pub fn pending_count(&self) -> u64 {
        self.tracker.len() as u64
    }

    /// Stop the timer and wait for queued snapshot writes.
    pub fn shutdown(&self) {
        self.tracker.shutdown();
        self.runtime.block_on(self.tracker.sync());
    }
}

/// Returns the version of interaction-tracker
#[uniffi::export]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
