//! Moves and the win relation

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A move in Rock-Paper-Scissor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Rock,
    Paper,
    Scissor,
}

impl Move {
    /// Fixed enumeration order. Tie-breaks and sampling both walk this order.
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissor];

    /// Position of this move in [`Move::ALL`]
    pub fn index(self) -> usize {
        match self {
            Move::Rock => 0,
            Move::Paper => 1,
            Move::Scissor => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissor => "scissor",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" => Ok(Move::Rock),
            "paper" => Ok(Move::Paper),
            "scissor" | "scissors" => Ok(Move::Scissor),
            _ => Err(EngineError::InvalidMove(s.to_string())),
        }
    }
}

/// Result of a single round from the human's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    HumanWins,
    BotWins,
    Draw,
}

/// The move that beats `m`
pub fn counter(m: Move) -> Move {
    match m {
        Move::Rock => Move::Paper,
        Move::Paper => Move::Scissor,
        Move::Scissor => Move::Rock,
    }
}

/// True iff `a` wins against `b`
pub fn beats(a: Move, b: Move) -> bool {
    matches!(
        (a, b),
        (Move::Rock, Move::Scissor) | (Move::Paper, Move::Rock) | (Move::Scissor, Move::Paper)
    )
}

/// Resolve a round
pub fn outcome(human: Move, bot: Move) -> Outcome {
    if human == bot {
        Outcome::Draw
    } else if beats(human, bot) {
        Outcome::HumanWins
    } else {
        Outcome::BotWins
    }
}
