//! Process-wide tracker scope
//!
//! Installing a scope makes a tracker reachable from code that was not handed
//! one explicitly. Scopes nest: dropping the inner guard restores the outer
//! tracker. Asking for the tracker with no scope installed is a usage error.

use std::sync::{PoisonError, RwLock};

use crate::error::{Result, TrackerError};
use crate::tracker::EventTracker;

static CURRENT: RwLock<Option<EventTracker>> = RwLock::new(None);

/// Guard for an installed tracker. Dropping it tears the scope down.
#[must_use = "the scope is removed as soon as the guard is dropped"]
pub struct TrackerScope {
    previous: Option<EventTracker>,
}

impl TrackerScope {
    pub fn install(tracker: EventTracker) -> Self {
        let mut slot = CURRENT.write().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.replace(tracker);
        tracing::debug!("Tracker scope installed");
        Self { previous }
    }
}

impl Drop for TrackerScope {
    fn drop(&mut self) {
        let mut slot = CURRENT.write().unwrap_or_else(PoisonError::into_inner);
        *slot = self.previous.take();
        tracing::debug!("Tracker scope removed");
    }
}

/// The tracker of the innermost installed scope.
pub fn current_tracker() -> Result<EventTracker> {
    CURRENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(TrackerError::OutsideScope)
}

/// Resolve the scoped tracker and bind a tap callback to it.
pub fn track_tap_in_scope(name: impl Into<String>) -> Result<impl Fn() + Send + Sync + 'static> {
    Ok(current_tracker()?.track_tap(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    // The slot is process-wide; scope tests must not interleave.
    fn scope_lock() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn tracker() -> EventTracker {
        EventTracker::builder(TrackerConfig::default())
            .start()
            .await
            .unwrap()
    }

    #[test]
    fn test_outside_scope_errors() {
        let _lock = scope_lock();
        assert!(matches!(current_tracker(), Err(TrackerError::OutsideScope)));
        assert!(track_tap_in_scope("button").is_err());
    }

    // Trackers are started before the lock is taken; nothing awaits while
    // it is held.
    #[tokio::test]
    async fn test_scope_exposes_tracker_until_dropped() {
        let tracker = tracker().await;

        let _lock = scope_lock();
        {
            let _scope = TrackerScope::install(tracker.clone());
            current_tracker().unwrap().log_event("inside", None);
            let tap = track_tap_in_scope("buy").unwrap();
            tap();
        }
        assert!(current_tracker().is_err());
        assert_eq!(tracker.len(), 2);
    }

    #[tokio::test]
    async fn test_nested_scopes_restore_outer() {
        let outer = tracker().await;
        let inner = tracker().await;

        let _lock = scope_lock();
        let outer_scope = TrackerScope::install(outer.clone());
        {
            let _inner_scope = TrackerScope::install(inner.clone());
            current_tracker().unwrap().log_event("inner", None);
        }
        current_tracker().unwrap().log_event("outer", None);
        drop(outer_scope);

        assert!(current_tracker().is_err());
        assert_eq!(inner.events()[0].event_type, "inner");
        assert_eq!(outer.events()[0].event_type, "outer");
        assert_eq!(outer.len(), 1);
    }
}
