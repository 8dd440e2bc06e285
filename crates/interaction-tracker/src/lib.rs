//! interaction-tracker: buffered interaction logging for mobile apps
//!
//! This library provides:
//! - An append-only in-memory buffer of interaction events
//! - Whole-buffer snapshot persistence to a key-value store, restored at start
//! - JSON and CSV export of the current buffer
//! - Periodic and on-demand upload to a remote collector, clearing the buffer
//!   only on acknowledged success
//! - A process-wide scope and tap-callback binding for UI code
//!
//! Storage and network failures never reach callers of
//! [`EventTracker::log_event`] or [`EventTracker::flush`]; they are logged
//! with `tracing` and the next flush retries with whatever is buffered.
//!
//! With the `native` feature the tracker is exposed to Swift/Kotlin via
//! UniFFI.

pub mod buffer;
pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
#[cfg(feature = "native")]
pub mod ffi;
pub mod flush;
pub mod persistence;
pub mod scope;
pub mod storage;
pub mod tracker;

pub use buffer::EventBuffer;
pub use collector::{Collector, FlushBatch, HttpCollector};
pub use config::{ConfigError, TrackerConfig};
pub use error::{CollectorError, Result, StorageError, TrackerError};
pub use event::{EventData, InteractionEvent};
pub use export::ExportFormat;
pub use flush::{FlushOutcome, SkipReason};
pub use scope::{current_tracker, track_tap_in_scope, TrackerScope};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;
pub use tracker::{EventTracker, TrackerBuilder};

// Setup UniFFI - proc macros only, no UDL file
#[cfg(feature = "native")]
uniffi::setup_scaffolding!();
