//! Round scoring and the persisted best record

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StoreError;

pub const BEST_SCORE_KEY: &str = "rps_best_score";
pub const BEST_ROUNDS_KEY: &str = "rps_best_rounds";

/// Points for a round win
pub const ROUND_WIN_POINTS: u32 = 100;
/// Bonus for locking in inside the decision window
pub const FAST_LOCK_BONUS: u32 = 10;

/// Score awarded for a human round win
pub fn round_score(fast: bool) -> u32 {
    ROUND_WIN_POINTS + if fast { FAST_LOCK_BONUS } else { 0 }
}

/// Best score seen across matches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestRecord {
    pub best_score: u32,
    pub best_rounds: u32,
}

/// External key-value store holding the best record
pub trait RecordStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Values may have been written by a JS host as plain numbers, e.g. "110" or "110.0"
fn parse_scalar(key: &str, raw: &str) -> Result<u32, StoreError> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<u32>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
        _ => Err(StoreError::Corrupt { key: key.to_string(), value: raw.to_string() }),
    }
}

fn load_scalar(store: &dyn RecordStore, key: &str) -> Result<u32, StoreError> {
    match store.load(key)? {
        Some(raw) => parse_scalar(key, &raw),
        None => Ok(0),
    }
}

/// Keeps the best record in memory and mirrors it to the store.
///
/// Any store failure switches the keeper to in-memory only for the rest of
/// the session.
pub struct ScoreKeeper {
    record: BestRecord,
    store: Box<dyn RecordStore>,
    degraded: bool,
}

impl ScoreKeeper {
    /// Read the persisted record once
    pub fn load(store: Box<dyn RecordStore>) -> Self {
        let loaded = load_scalar(store.as_ref(), BEST_SCORE_KEY).and_then(|best_score| {
            let best_rounds = load_scalar(store.as_ref(), BEST_ROUNDS_KEY)?;
            Ok(BestRecord { best_score, best_rounds })
        });

        match loaded {
            Ok(record) => Self { record, store, degraded: false },
            Err(error) => {
                warn!(%error, "best record unavailable, keeping it in memory");
                Self { record: BestRecord::default(), store, degraded: true }
            }
        }
    }

    pub fn record(&self) -> BestRecord {
        self.record
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Overwrite the record iff `score` strictly beats it.
    ///
    /// Ties never write, so repeating a call with the same inputs is a no-op.
    pub fn maybe_update_best_record(&mut self, score: u32, rounds: u32) -> bool {
        if score <= self.record.best_score {
            return false;
        }

        self.record = BestRecord { best_score: score, best_rounds: rounds };
        info!(score, rounds, "new best record");

        if !self.degraded {
            if let Err(error) = self.persist() {
                warn!(%error, "could not save best record, keeping it in memory");
                self.degraded = true;
            }
        }
        true
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.store.save(BEST_SCORE_KEY, &self.record.best_score.to_string())?;
        self.store.save(BEST_ROUNDS_KEY, &self.record.best_rounds.to_string())?;
        Ok(())
    }
}

impl Default for ScoreKeeper {
    fn default() -> Self {
        Self::load(Box::new(MemoryStore::new()))
    }
}

impl core::fmt::Debug for ScoreKeeper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScoreKeeper")
            .field("record", &self.record)
            .field("degraded", &self.degraded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Store that counts writes and can be told to fail
    #[derive(Clone, Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: Rc<Cell<usize>>,
        fail_loads: bool,
        fail_saves: bool,
    }

    impl RecordStore for CountingStore {
        fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_loads {
                return Err(StoreError::Unavailable("offline".into()));
            }
            self.inner.load(key)
        }

        fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_saves {
                return Err(StoreError::Unavailable("quota exceeded".into()));
            }
            self.writes.set(self.writes.get() + 1);
            self.inner.save(key, value)
        }
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(false), 100);
        assert_eq!(round_score(true), 110);
    }

    #[test]
    fn test_empty_store_loads_zero() {
        let keeper = ScoreKeeper::load(Box::new(MemoryStore::new()));
        assert_eq!(keeper.record(), BestRecord::default());
        assert!(!keeper.is_degraded());
    }

    #[test]
    fn test_loads_existing_record() {
        let mut store = MemoryStore::new();
        store.save(BEST_SCORE_KEY, "530").unwrap();
        store.save(BEST_ROUNDS_KEY, "9").unwrap();

        let keeper = ScoreKeeper::load(Box::new(store));
        assert_eq!(keeper.record(), BestRecord { best_score: 530, best_rounds: 9 });
    }

    #[test]
    fn test_loads_js_float_values() {
        let mut store = MemoryStore::new();
        store.save(BEST_SCORE_KEY, "420.0").unwrap();
        let keeper = ScoreKeeper::load(Box::new(store));
        assert_eq!(keeper.record().best_score, 420);
        assert_eq!(keeper.record().best_rounds, 0);
    }

    #[test]
    fn test_corrupt_value_degrades() {
        let mut store = MemoryStore::new();
        store.save(BEST_SCORE_KEY, "lots").unwrap();
        let keeper = ScoreKeeper::load(Box::new(store));
        assert!(keeper.is_degraded());
        assert_eq!(keeper.record(), BestRecord::default());
    }

    #[test]
    fn test_update_writes_both_keys() {
        let store = MemoryStore::new();
        let mut keeper = ScoreKeeper::load(Box::new(store.clone()));

        assert!(keeper.maybe_update_best_record(310, 6));
        assert_eq!(store.get(BEST_SCORE_KEY).as_deref(), Some("310"));
        assert_eq!(store.get(BEST_ROUNDS_KEY).as_deref(), Some("6"));
    }

    #[test]
    fn test_lower_score_does_not_overwrite() {
        let mut keeper = ScoreKeeper::default();
        keeper.maybe_update_best_record(500, 10);
        assert!(!keeper.maybe_update_best_record(200, 3));
        assert_eq!(keeper.record(), BestRecord { best_score: 500, best_rounds: 10 });
    }

    #[test]
    fn test_equal_score_is_idempotent() {
        let store = CountingStore::default();
        let writes = store.writes.clone();
        let mut keeper = ScoreKeeper::load(Box::new(store));

        assert!(keeper.maybe_update_best_record(300, 5));
        let after_first = writes.get();
        assert!(after_first > 0);

        assert!(!keeper.maybe_update_best_record(300, 5));
        assert!(!keeper.maybe_update_best_record(300, 2));
        assert_eq!(writes.get(), after_first);
        assert_eq!(keeper.record(), BestRecord { best_score: 300, best_rounds: 5 });
    }

    #[test]
    fn test_zero_score_never_writes() {
        let store = CountingStore::default();
        let writes = store.writes.clone();
        let mut keeper = ScoreKeeper::load(Box::new(store));
        assert!(!keeper.maybe_update_best_record(0, 4));
        assert_eq!(writes.get(), 0);
    }

    #[test]
    fn test_unavailable_store_degrades_to_memory() {
        let store = CountingStore { fail_loads: true, ..Default::default() };
        let mut keeper = ScoreKeeper::load(Box::new(store));
        assert!(keeper.is_degraded());

        assert!(keeper.maybe_update_best_record(120, 2));
        assert_eq!(keeper.record().best_score, 120);
    }

    #[test]
    fn test_failed_save_keeps_memory_record() {
        let store = CountingStore { fail_saves: true, ..Default::default() };
        let mut keeper = ScoreKeeper::load(Box::new(store));
        assert!(!keeper.is_degraded());

        assert!(keeper.maybe_update_best_record(220, 4));
        assert!(keeper.is_degraded());
        assert_eq!(keeper.record(), BestRecord { best_score: 220, best_rounds: 4 });
    }
}
