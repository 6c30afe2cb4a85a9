//! Deferred continuations with cancellation
//!
//! The engine never owns a real timer. It records what should happen and
//! when; the host pumps due work through `MatchEngine::run_pending`.

use serde::{Deserialize, Serialize};

/// Work the engine defers to a later point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Continuation {
    /// Reveal delay elapsed: resolve the submitted round
    Resolve,
    /// Clear delay elapsed: move on to the next round
    AdvanceRound,
    /// End-of-match banner elapsed: start a fresh match
    AutoReset,
}

/// Identifies one scheduled continuation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CancelHandle(u64);

#[derive(Clone, Debug)]
struct Scheduled {
    handle: CancelHandle,
    due_at: u64,
    task: Continuation,
}

/// Pending continuations ordered by due time, then by scheduling order
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    pending: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_after(&mut self, now: u64, delay_ms: u64, task: Continuation) -> CancelHandle {
        let handle = CancelHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled { handle, due_at: now.saturating_add(delay_ms), task });
        handle
    }

    /// Returns false if the handle already fired or was cancelled
    pub fn cancel(&mut self, handle: CancelHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Earliest due time among pending continuations
    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|s| s.due_at).min()
    }

    /// Remove and return the earliest continuation due at or before `now`
    pub fn pop_due(&mut self, now: u64) -> Option<(CancelHandle, Continuation)> {
        let pos = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_at <= now)
            .min_by_key(|(_, s)| (s.due_at, s.handle.0))
            .map(|(i, _)| i)?;
        let s = self.pending.remove(pos);
        Some((s.handle, s.task))
    }
}
