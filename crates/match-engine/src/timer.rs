//! Clocks and the per-round decision window

use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default decision window per round
pub const DECISION_WINDOW_MS: u64 = 5_000;

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall clock, milliseconds since the Unix epoch
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock moved by hand. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: Rc::new(Cell::new(start_ms)) }
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Decision window for the current round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundTimer {
    pub started_at: u64,
    pub window_ms: u64,
}

impl RoundTimer {
    pub fn start(now: u64, window_ms: u64) -> Self {
        Self { started_at: now, window_ms }
    }

    /// Time since the window opened. A clock that stepped backwards counts as zero.
    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_at)
    }

    pub fn remaining(&self, now: u64) -> u64 {
        self.window_ms.saturating_sub(self.elapsed(now))
    }

    /// Whether a pick made at `now` lands inside the window (inclusive)
    pub fn committed_fast(&self, now: u64) -> bool {
        self.elapsed(now) <= self.window_ms
    }
}
