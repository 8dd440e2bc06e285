//! Flush outcomes and the in-flight guard.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Why a flush did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No remote endpoint or collector is configured
    NoEndpoint,
    /// Another flush is still waiting on the collector
    InFlight,
}

/// What a call to `flush` did. Purely informational: failures have already
/// been logged and the buffer left intact for the next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Skipped(SkipReason),
    /// Buffer was empty; no request was made
    Empty,
    /// Collector acknowledged; these events left the buffer
    Delivered { count: usize },
    /// Collector answered with a non-success status
    Rejected { status: u16 },
    /// The request never completed
    Failed { reason: String },
}

impl FlushOutcome {
    /// `true` when a request reached the collector and was acknowledged.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// `true` when a network call was attempted.
    pub fn attempted_request(&self) -> bool {
        matches!(
            self,
            Self::Delivered { .. } | Self::Rejected { .. } | Self::Failed { .. }
        )
    }
}

impl fmt::Display for FlushOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(SkipReason::NoEndpoint) => write!(f, "skipped: no remote endpoint"),
            Self::Skipped(SkipReason::InFlight) => write!(f, "skipped: flush already in flight"),
            Self::Empty => write!(f, "nothing to flush"),
            Self::Delivered { count } => write!(f, "delivered {} events", count),
            Self::Rejected { status } => write!(f, "rejected with HTTP {}", status),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Holds the in-flight flag; releases it on drop, whatever the outcome.
pub(crate) struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    /// `None` when a flush already holds the flag.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
