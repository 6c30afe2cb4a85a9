//! Match Engine for Rock-Paper-Scissor Arena
//!
//! Core game logic for HP duels against an adaptive bot.
//! This crate is compiled to:
//! - Native (for hosts and tests)
//! - WASM (for the browser renderer)

mod error;
mod game;
mod moves;
mod random;
mod record;
mod schedule;
mod strategy;
mod timer;

#[cfg(feature = "wasm")]
mod wasm;

pub use error::{EngineError, StoreError};
pub use game::{
    apply_round, DamageEvent, EngineConfig, MatchEngine, MatchResult, MatchState, PendingRound,
    Phase, RoundReport, Side, Snapshot, HISTORY_LIMIT, MAX_HP,
};
pub use moves::{beats, counter, outcome, Move, Outcome};
pub use random::SeededRng;
pub use record::{
    round_score, BestRecord, MemoryStore, RecordStore, ScoreKeeper, BEST_ROUNDS_KEY,
    BEST_SCORE_KEY,
};
pub use schedule::{CancelHandle, Continuation, Scheduler};
pub use strategy::{
    choose_bot_move, describe_difficulty, most_frequent, move_distribution, Difficulty,
    DifficultyProfile, Distribution,
};
pub use timer::{Clock, ManualClock, RoundTimer, SystemClock, DECISION_WINDOW_MS};
