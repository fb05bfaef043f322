use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Commit timestamp: milliseconds since the UNIX epoch.
///
/// Every version of every object and every commit is stamped with one of
/// these. Within a stage they strictly increase.
pub type Timestamp = i64;

/// Source of wall-clock time for commit stamping.
///
/// The commit log never trusts the clock alone: it takes
/// `max(clock, previous + 1)` so a clock that stalls or steps backwards still
/// yields strictly increasing timestamps.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the UNIX epoch.
    fn now_millis(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// A clock whose value is set explicitly.
///
/// Used in tests and replay tooling where commit timestamps must be
/// predictable.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Set the clock to an absolute value.
    pub fn set(&self, value: Timestamp) {
        self.now.store(value, Ordering::SeqCst);
    }

    /// Move the clock forward by `delta` milliseconds.
    pub fn advance(&self, delta: Timestamp) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManualClock({})", self.now_millis())
    }
}

/// Next commit timestamp for a stage whose latest commit is `previous`.
pub fn next_timestamp(now: Timestamp, previous: Option<Timestamp>) -> Timestamp {
    match previous {
        None => now,
        Some(prev) => now.max(prev.saturating_add(1)),
    }
}
