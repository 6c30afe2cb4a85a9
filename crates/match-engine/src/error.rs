//! Error types for the match engine

use thiserror::Error;

use crate::game::Phase;

/// Errors returned by engine operations.
///
/// Every error is reported before any state is touched, so a rejected call
/// leaves the match exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Text that does not name one of the three moves.
    #[error("invalid move: {0:?}")]
    InvalidMove(String),

    /// Difficulty text that does not name a known level.
    #[error("invalid difficulty: {0:?}")]
    InvalidDifficulty(String),

    /// Operation attempted outside the phase that allows it.
    #[error("cannot {action} while {phase}")]
    IllegalState { action: &'static str, phase: Phase },
}

/// Errors surfaced by a [`crate::RecordStore`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backing store could not be reached.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be parsed.
    #[error("corrupt value {value:?} under key {key:?}")]
    Corrupt { key: String, value: String },
}
