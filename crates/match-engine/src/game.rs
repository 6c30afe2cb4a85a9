//! Match execution engine
//!
//! One [`MatchEngine`] owns one [`MatchState`] and walks it through
//! `AwaitingPick -> Resolving -> RoundAdvance | MatchEnd`. Every mutation takes
//! `&mut self`; delays between phases are deferred continuations that the host
//! pumps with [`MatchEngine::run_pending`].

use core::fmt;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::moves::{outcome, Move, Outcome};
use crate::random::SeededRng;
use crate::record::{round_score, BestRecord, MemoryStore, RecordStore, ScoreKeeper};
use crate::schedule::{CancelHandle, Continuation, Scheduler};
use crate::strategy::{choose_bot_move, Difficulty};
use crate::timer::{Clock, RoundTimer, SystemClock, DECISION_WINDOW_MS};

/// Starting (and maximum) hit points for both sides
pub const MAX_HP: u32 = 100;

/// Upper bound on remembered human moves, whatever the config asks for
pub const HISTORY_LIMIT: usize = 10;

const PICK_PROMPT: &str = "Pick a card";

/// Engine timing and sizing knobs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Decision window per round
    pub window_ms: u64,
    /// Pause between a pick and its resolution (card reveal)
    pub reveal_delay_ms: u64,
    /// Pause between a resolved round and the next one
    pub clear_delay_ms: u64,
    /// How long the end-of-match result stays up before a fresh match starts
    pub end_delay_ms: u64,
    /// How many recent human moves the bot remembers, at most [`HISTORY_LIMIT`]
    pub history_capacity: usize,
    /// Seed for the bot's draws. Taken from the clock when absent.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_ms: DECISION_WINDOW_MS,
            reveal_delay_ms: 600,
            clear_delay_ms: 400,
            end_delay_ms: 1_500,
            history_capacity: HISTORY_LIMIT,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// No presentation delays: every continuation is due immediately
    pub fn instant() -> Self {
        Self { reveal_delay_ms: 0, clear_delay_ms: 0, end_delay_ms: 0, ..Self::default() }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Where a match is in its round lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AwaitingPick,
    Resolving,
    RoundAdvance,
    MatchEnd,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::AwaitingPick => "awaiting a pick",
            Phase::Resolving => "resolving",
            Phase::RoundAdvance => "advancing to the next round",
            Phase::MatchEnd => "the match is over",
        })
    }
}

/// Final result of a match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    HumanWon,
    HumanLost,
}

/// Which side took damage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Human,
    Bot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub target: Side,
    pub amount: u32,
}

/// Scratch for the round being resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRound {
    pub human: Move,
    pub bot: Move,
    /// Locked in inside the decision window
    pub fast: bool,
    /// Captured at submission; later difficulty changes apply to later rounds
    pub difficulty: Difficulty,
}

/// Result of resolving a single round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub round: u32,
    pub human: Move,
    pub bot: Move,
    pub outcome: Outcome,
    pub fast: bool,
    pub damage: Option<DamageEvent>,
    pub score_delta: u32,
    pub shield_earned: bool,
    pub shield_consumed: bool,
    pub result: Option<MatchResult>,
}

/// Everything that changes during one match
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchState {
    pub phase: Phase,
    pub user_hp: u32,
    pub bot_hp: u32,
    pub round: u32,
    pub streak: u32,
    pub has_shield: bool,
    pub shield_armed: bool,
    pub recent_human_moves: VecDeque<Move>,
    pub score: u32,
    pub timer: RoundTimer,
    pub pending: Option<PendingRound>,
    pub user_wins: u32,
    pub bot_wins: u32,
    pub last_human_move: Option<Move>,
    pub last_bot_move: Option<Move>,
    pub message: String,
    pub result: Option<MatchResult>,
}

impl MatchState {
    pub fn new(now: u64, window_ms: u64) -> Self {
        Self {
            phase: Phase::AwaitingPick,
            user_hp: MAX_HP,
            bot_hp: MAX_HP,
            round: 1,
            streak: 0,
            has_shield: false,
            shield_armed: false,
            recent_human_moves: VecDeque::new(),
            score: 0,
            timer: RoundTimer::start(now, window_ms),
            pending: None,
            user_wins: 0,
            bot_wins: 0,
            last_human_move: None,
            last_bot_move: None,
            message: PICK_PROMPT.to_string(),
            result: None,
        }
    }

    /// Both sides still standing
    pub fn is_live(&self) -> bool {
        self.user_hp > 0 && self.bot_hp > 0
    }

    fn remember(&mut self, m: Move, capacity: usize) {
        self.recent_human_moves.push_back(m);
        while self.recent_human_moves.len() > capacity {
            self.recent_human_moves.pop_front();
        }
    }
}

/// Apply one round's outcome to HP, streak, shield and score
///
/// Does not touch the phase; the engine decides what comes next from
/// `report.result`.
pub fn apply_round(state: &mut MatchState, pending: &PendingRound) -> RoundReport {
    let damage = pending.difficulty.damage();
    let result = outcome(pending.human, pending.bot);

    let mut report = RoundReport {
        round: state.round,
        human: pending.human,
        bot: pending.bot,
        outcome: result,
        fast: pending.fast,
        damage: None,
        score_delta: 0,
        shield_earned: false,
        shield_consumed: false,
        result: None,
    };

    match result {
        Outcome::Draw => {
            state.streak = 0;
            state.message = "Draw. No damage.".to_string();
        }
        Outcome::HumanWins => {
            state.bot_hp = state.bot_hp.saturating_sub(damage);
            state.user_wins += 1;
            state.streak += 1;
            // Re-earning while a shield is held does not stack
            if state.streak >= 2 {
                report.shield_earned = !state.has_shield;
                state.has_shield = true;
            }
            report.score_delta = round_score(pending.fast);
            state.score += report.score_delta;
            report.damage = Some(DamageEvent { target: Side::Bot, amount: damage });
            state.message = format!("You win the round! {} dmg", damage);
        }
        Outcome::BotWins => {
            let mut applied = damage;
            if state.has_shield && state.shield_armed {
                applied = damage / 2;
                state.has_shield = false;
                state.shield_armed = false;
                report.shield_consumed = true;
            }
            state.user_hp = state.user_hp.saturating_sub(applied);
            state.bot_wins += 1;
            state.streak = 0;
            report.damage = Some(DamageEvent { target: Side::Human, amount: applied });
            state.message = format!("Bot wins the round! {} dmg to you", applied);
        }
    }

    state.last_human_move = Some(pending.human);
    state.last_bot_move = Some(pending.bot);

    report.result = if state.bot_hp == 0 {
        Some(MatchResult::HumanWon)
    } else if state.user_hp == 0 {
        Some(MatchResult::HumanLost)
    } else {
        None
    };
    state.result = report.result;
    report
}

/// Read-only view handed to the renderer after every transition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub phase: Phase,
    pub difficulty: Difficulty,
    pub user_hp: u32,
    pub bot_hp: u32,
    pub round: u32,
    pub streak: u32,
    pub has_shield: bool,
    pub shield_armed: bool,
    pub score: u32,
    pub message: String,
    pub last_human_move: Option<Move>,
    pub last_bot_move: Option<Move>,
    pub remaining_ms: u64,
    pub result: Option<MatchResult>,
    pub user_wins: u32,
    pub bot_wins: u32,
    pub best_record: BestRecord,
}

/// Drives one human-vs-bot session, match after match
pub struct MatchEngine {
    config: EngineConfig,
    difficulty: Difficulty,
    state: MatchState,
    rng: SeededRng,
    clock: Box<dyn Clock>,
    scheduler: Scheduler,
    /// The single continuation the current phase is waiting on
    waiting_on: Option<CancelHandle>,
    keeper: ScoreKeeper,
    /// Matches started after the first one
    matches: u64,
}

impl MatchEngine {
    /// Create an engine and open the first round
    pub fn new(config: EngineConfig, clock: Box<dyn Clock>, store: Box<dyn RecordStore>) -> Self {
        let now = clock.now_ms();
        let seed = config.seed.unwrap_or(now);
        let keeper = ScoreKeeper::load(store);
        debug!(seed, best = keeper.record().best_score, "engine created");

        Self {
            state: MatchState::new(now, config.window_ms),
            config,
            difficulty: Difficulty::default(),
            rng: SeededRng::new(seed),
            clock,
            scheduler: Scheduler::new(),
            waiting_on: None,
            keeper,
            matches: 0,
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn best_record(&self) -> BestRecord {
        self.keeper.record()
    }

    fn expect_phase(&self, phase: Phase, action: &'static str) -> Result<(), EngineError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(EngineError::IllegalState { action, phase: self.state.phase })
        }
    }

    fn cancel_waiting(&mut self) {
        if let Some(handle) = self.waiting_on.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn defer(&mut self, delay_ms: u64, task: Continuation) {
        let now = self.clock.now_ms();
        self.waiting_on = Some(self.scheduler.schedule_after(now, delay_ms, task));
    }

    /// Restart the decision window of the round awaiting a pick
    pub fn start_round(&mut self) -> Result<(), EngineError> {
        self.expect_phase(Phase::AwaitingPick, "start a round")?;
        self.open_round();
        Ok(())
    }

    fn open_round(&mut self) {
        self.cancel_waiting();
        self.state.timer = RoundTimer::start(self.clock.now_ms(), self.config.window_ms);
        self.state.pending = None;
        self.state.phase = Phase::AwaitingPick;
    }

    /// Lock in the human's move; the bot answers immediately and the round
    /// resolves after the reveal delay.
    pub fn submit_human_move(&mut self, human: Move) -> Result<PendingRound, EngineError> {
        self.expect_phase(Phase::AwaitingPick, "submit a move")?;
        let fast = self.state.timer.committed_fast(self.clock.now_ms());
        let history: Vec<Move> = self.state.recent_human_moves.iter().copied().collect();
        let bot = choose_bot_move(self.difficulty, &history, fast, &mut self.rng);
        Ok(self.commit(human, bot, fast))
    }

    /// Parse a move from renderer text, then submit it
    pub fn submit_human_move_str(&mut self, text: &str) -> Result<PendingRound, EngineError> {
        let human: Move = text.parse()?;
        self.submit_human_move(human)
    }

    fn commit(&mut self, human: Move, bot: Move, fast: bool) -> PendingRound {
        let pending = PendingRound { human, bot, fast, difficulty: self.difficulty };
        self.state.remember(human, self.config.history_capacity.min(HISTORY_LIMIT));
        self.state.pending = Some(pending);
        self.state.phase = Phase::Resolving;
        debug!(round = self.state.round, %human, %bot, fast, "move submitted");
        self.defer(self.config.reveal_delay_ms, Continuation::Resolve);
        pending
    }

    /// Resolve the submitted round
    pub fn resolve(&mut self) -> Result<RoundReport, EngineError> {
        self.expect_phase(Phase::Resolving, "resolve")?;
        let pending = self
            .state
            .pending
            .ok_or(EngineError::IllegalState { action: "resolve", phase: Phase::Resolving })?;
        self.cancel_waiting();

        let report = apply_round(&mut self.state, &pending);
        debug!(
            round = report.round,
            outcome = ?report.outcome,
            user_hp = self.state.user_hp,
            bot_hp = self.state.bot_hp,
            "round resolved"
        );

        match report.result {
            Some(result) => {
                self.state.phase = Phase::MatchEnd;
                info!(?result, score = self.state.score, rounds = self.state.round, "match over");
                self.keeper.maybe_update_best_record(self.state.score, self.state.round);
                self.defer(self.config.end_delay_ms, Continuation::AutoReset);
            }
            None => {
                self.state.phase = Phase::RoundAdvance;
                self.defer(self.config.clear_delay_ms, Continuation::AdvanceRound);
            }
        }
        Ok(report)
    }

    /// Move on from a resolved round
    pub fn advance_round(&mut self) -> Result<(), EngineError> {
        self.expect_phase(Phase::RoundAdvance, "advance the round")?;
        self.state.round += 1;
        self.open_round();
        Ok(())
    }

    /// Toggle the shield. Without a shield this does nothing.
    pub fn arm_shield(&mut self) -> bool {
        if self.state.has_shield {
            self.state.shield_armed = !self.state.shield_armed;
            debug!(armed = self.state.shield_armed, "shield toggled");
        }
        self.state.shield_armed
    }

    /// Takes effect from the next submitted move
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        if self.difficulty != difficulty {
            debug!(from = %self.difficulty, to = %difficulty, "difficulty changed");
        }
        self.difficulty = difficulty;
    }

    /// Start a new match. Pending continuations of the old one are dropped
    /// and the bot draws from a fresh stream.
    pub fn reset(&mut self) {
        let dropped = self.scheduler.cancel_all();
        self.waiting_on = None;
        self.matches += 1;
        self.rng = self.rng.fork(self.matches);
        self.state = MatchState::new(self.clock.now_ms(), self.config.window_ms);
        debug!(dropped, matches = self.matches, "match reset");
    }

    /// Fire every continuation that is due. Returns how many fired.
    pub fn run_pending(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        while let Some((handle, task)) = self.scheduler.pop_due(now) {
            if self.waiting_on == Some(handle) {
                self.waiting_on = None;
            }
            fired += 1;
            let ran = match task {
                Continuation::Resolve => self.resolve().map(|_| ()),
                Continuation::AdvanceRound => self.advance_round(),
                Continuation::AutoReset => {
                    self.reset();
                    Ok(())
                }
            };
            if let Err(error) = ran {
                debug!(?task, %error, "stale continuation skipped");
            }
        }
        fired
    }

    /// Milliseconds until the next continuation is due
    pub fn next_due_in_ms(&self) -> Option<u64> {
        let now = self.clock.now_ms();
        self.scheduler.next_due().map(|due| due.saturating_sub(now))
    }

    /// Current state as the renderer sees it. Never mutates the match.
    pub fn snapshot(&self) -> Snapshot {
        let s = &self.state;
        Snapshot {
            phase: s.phase,
            difficulty: self.difficulty,
            user_hp: s.user_hp,
            bot_hp: s.bot_hp,
            round: s.round,
            streak: s.streak,
            has_shield: s.has_shield,
            shield_armed: s.shield_armed,
            score: s.score,
            message: s.message.clone(),
            last_human_move: s.last_human_move,
            last_bot_move: s.last_bot_move,
            remaining_ms: s.timer.remaining(self.clock.now_ms()),
            result: s.result,
            user_wins: s.user_wins,
            bot_wins: s.bot_wins,
            best_record: self.keeper.record(),
        }
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), Box::new(SystemClock), Box::new(MemoryStore::new()))
    }
}

impl fmt::Debug for MatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchEngine")
            .field("config", &self.config)
            .field("difficulty", &self.difficulty)
            .field("state", &self.state)
            .field("scheduler", &self.scheduler)
            .field("keeper", &self.keeper)
            .finish()
    }
}
