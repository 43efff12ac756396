#![forbid(unsafe_code)]

//! Debounced auto-save timer.
//!
//! Every accepted edit re-arms the timer; it fires once the editor has been
//! idle for the configured delay. Time is passed in by the caller, so the
//! timer is deterministic under test and needs no thread of its own.
//!
//! ```
//! use std::time::{Duration, Instant};
//! use pagesmith_runtime::autosave::AutoSaveTimer;
//!
//! let start = Instant::now();
//! let mut timer = AutoSaveTimer::new(Duration::from_secs(5));
//! timer.arm(start);
//! timer.arm(start + Duration::from_secs(3)); // another edit
//! assert!(!timer.poll(start + Duration::from_secs(5)));
//! assert!(timer.poll(start + Duration::from_secs(8)));
//! assert!(!timer.is_armed());
//! ```

use std::time::{Duration, Instant};

/// Delay used by the editor when nothing else is configured.
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(5);

/// A cancelable, re-armable one-shot deadline.
#[derive(Debug, Clone)]
pub struct AutoSaveTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for AutoSaveTimer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_DELAY)
    }
}

impl AutoSaveTimer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the countdown from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Clear the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fire if the deadline has passed. Fires at most once per arm.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
