//! Bot difficulty levels and the adaptive opponent policy

use core::fmt;
use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::moves::{counter, Move};

/// Difficulty selected by the player before a round
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Tuning numbers behind a difficulty level
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// How hard the bot leans toward countering the player's favourite move
    pub bias_strength: f64,
    /// HP removed from the loser of a decisive round
    pub damage: u32,
    /// Extra shift applied when the player locks in inside the window
    pub fast_lock_nudge: f64,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile { bias_strength: 0.3, damage: 12, fast_lock_nudge: 0.0 },
            Difficulty::Medium => DifficultyProfile { bias_strength: 0.5, damage: 15, fast_lock_nudge: 0.05 },
            Difficulty::Hard => DifficultyProfile { bias_strength: 0.7, damage: 18, fast_lock_nudge: 0.08 },
        }
    }

    /// Damage dealt per decisive round at this level
    pub fn damage(self) -> u32 {
        self.profile().damage
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(EngineError::InvalidDifficulty(s.to_string())),
        }
    }
}

/// Probability of each move, indexed in [`Move::ALL`] order
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distribution(pub [f64; 3]);

impl Distribution {
    pub fn uniform() -> Self {
        Self([1.0 / 3.0; 3])
    }

    pub fn prob(&self, m: Move) -> f64 {
        self.0[m.index()]
    }

    /// Clamp negatives to zero and rescale to a total of one.
    /// A distribution with no positive mass falls back to uniform.
    fn normalized(self) -> Self {
        let clamped = self.0.map(|p| if p.is_finite() { p.max(0.0) } else { 0.0 });
        let total: f64 = clamped.iter().sum();
        if total <= 0.0 {
            return Self::uniform();
        }
        Self(clamped.map(|p| p / total))
    }

    /// Walk the cumulative distribution in Rock, Paper, Scissor order
    pub fn sample(&self, r: f64) -> Move {
        let mut cumulative = 0.0;
        for m in Move::ALL {
            cumulative += self.prob(m);
            if r < cumulative {
                return m;
            }
        }
        // r landed past the last bucket through rounding
        Move::ALL
            .into_iter()
            .rev()
            .find(|&m| self.prob(m) > 0.0)
            .unwrap_or(Move::Scissor)
    }
}

/// Most frequent move in the history.
///
/// Ties go to the move that comes first in [`Move::ALL`].
pub fn most_frequent(history: &[Move]) -> Option<Move> {
    if history.is_empty() {
        return None;
    }

    let mut counts = [0usize; 3];
    for m in history {
        counts[m.index()] += 1;
    }

    let mut best = Move::Rock;
    for m in Move::ALL {
        if counts[m.index()] > counts[best.index()] {
            best = m;
        }
    }
    Some(best)
}

/// Shift mass toward Paper when the player commits quickly
fn fast_lock_nudge(d: Distribution, amount: f64) -> Distribution {
    let [rock, paper, scissor] = d.0;
    Distribution([
        (rock - amount / 3.0).max(0.05),
        (paper + amount / 2.0).min(0.9),
        (scissor - amount / 6.0).max(0.05),
    ])
}

/// Compute the bot's move distribution for the coming round
///
/// # Arguments
/// * `difficulty` - Current difficulty level
/// * `history` - Player's recent moves, oldest first
/// * `committed_fast` - Whether the player locked in inside the decision window
pub fn move_distribution(difficulty: Difficulty, history: &[Move], committed_fast: bool) -> Distribution {
    let profile = difficulty.profile();
    let mut probs = Distribution::uniform();

    if let Some(favourite) = most_frequent(history) {
        let target = counter(favourite);
        let boost = profile.bias_strength * 0.5;
        for m in Move::ALL {
            if m == target {
                probs.0[m.index()] += boost;
            } else {
                probs.0[m.index()] -= boost / 2.0;
            }
        }
    }

    if committed_fast && profile.fast_lock_nudge > 0.0 {
        probs = fast_lock_nudge(probs, profile.fast_lock_nudge);
    }

    probs.normalized()
}

/// Draw the bot's move for one round
pub fn choose_bot_move<R: Rng + ?Sized>(
    difficulty: Difficulty,
    history: &[Move],
    committed_fast: bool,
    rng: &mut R,
) -> Move {
    let r: f64 = rng.gen();
    move_distribution(difficulty, history, committed_fast).sample(r)
}

/// Human-readable description of a difficulty level
pub fn describe_difficulty(difficulty: Difficulty) -> String {
    let profile = difficulty.profile();
    let mut desc = format!(
        "Deals {} damage per win. Leans {:.0}% toward countering your favourite move.",
        profile.damage,
        profile.bias_strength * 50.0,
    );
    if profile.fast_lock_nudge > 0.0 {
        desc.push_str(" Punishes snap decisions.");
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRng;

    const SAMPLES: usize = 10_000;

    fn frequencies(difficulty: Difficulty, history: &[Move], fast: bool, seed: u64) -> [f64; 3] {
        let mut rng = SeededRng::new(seed);
        let mut counts = [0usize; 3];
        for _ in 0..SAMPLES {
            counts[choose_bot_move(difficulty, history, fast, &mut rng).index()] += 1;
        }
        counts.map(|c| c as f64 / SAMPLES as f64)
    }

    fn assert_sums_to_one(d: &Distribution) {
        let total: f64 = d.0.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "distribution sums to {}", total);
        assert!(d.0.iter().all(|&p| p >= 0.0), "negative probability in {:?}", d);
    }

    #[test]
    fn test_profiles() {
        assert_eq!(Difficulty::Easy.damage(), 12);
        assert_eq!(Difficulty::Medium.damage(), 15);
        assert_eq!(Difficulty::Hard.damage(), 18);
        assert_eq!(Difficulty::Easy.profile().fast_lock_nudge, 0.0);
        assert_eq!(Difficulty::Hard.profile().bias_strength, 0.7);
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }

    #[test]
    fn test_parse_difficulty() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_empty_history_is_uniform() {
        for d in Difficulty::ALL {
            let probs = move_distribution(d, &[], false);
            for m in Move::ALL {
                assert!((probs.prob(m) - 1.0 / 3.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_most_frequent_tie_break() {
        assert_eq!(most_frequent(&[]), None);
        assert_eq!(most_frequent(&[Move::Scissor, Move::Paper]), Some(Move::Paper));
        assert_eq!(most_frequent(&[Move::Scissor, Move::Rock]), Some(Move::Rock));
        assert_eq!(
            most_frequent(&[Move::Scissor, Move::Scissor, Move::Rock]),
            Some(Move::Scissor)
        );
    }

    #[test]
    fn test_bias_toward_counter() {
        let history = [Move::Rock, Move::Rock, Move::Paper];
        let probs = move_distribution(Difficulty::Medium, &history, false);
        assert_sums_to_one(&probs);
        assert!((probs.prob(Move::Paper) - (1.0 / 3.0 + 0.25)).abs() < 1e-9);
        assert!((probs.prob(Move::Rock) - (1.0 / 3.0 - 0.125)).abs() < 1e-9);
        assert!((probs.prob(Move::Scissor) - (1.0 / 3.0 - 0.125)).abs() < 1e-9);
    }

    #[test]
    fn test_fast_lock_nudge_only_medium_and_hard() {
        let history = [Move::Scissor];
        assert_eq!(
            move_distribution(Difficulty::Easy, &history, true),
            move_distribution(Difficulty::Easy, &history, false)
        );

        let slow = move_distribution(Difficulty::Hard, &history, false);
        let fast = move_distribution(Difficulty::Hard, &history, true);
        assert_sums_to_one(&fast);
        assert!(fast.prob(Move::Paper) > slow.prob(Move::Paper));
        assert!(fast.prob(Move::Rock) < slow.prob(Move::Rock));
    }

    #[test]
    fn test_nudge_floors_and_ceiling() {
        let squeezed = fast_lock_nudge(Distribution([0.0, 0.95, 0.0]), 0.08);
        assert_eq!(squeezed.0[0], 0.05);
        assert_eq!(squeezed.0[1], 0.9);
        assert_eq!(squeezed.0[2], 0.05);
    }

    #[test]
    fn test_normalize_negative_and_empty_mass() {
        let d = Distribution([-0.2, 0.6, 0.2]).normalized();
        assert_sums_to_one(&d);
        assert_eq!(d.0[0], 0.0);

        assert_eq!(Distribution([0.0, -1.0, 0.0]).normalized(), Distribution::uniform());
    }

    #[test]
    fn test_sample_walks_cumulative_order() {
        let d = Distribution([0.2, 0.3, 0.5]);
        assert_eq!(d.sample(0.0), Move::Rock);
        assert_eq!(d.sample(0.19), Move::Rock);
        assert_eq!(d.sample(0.2), Move::Paper);
        assert_eq!(d.sample(0.49), Move::Paper);
        assert_eq!(d.sample(0.5), Move::Scissor);
        assert_eq!(d.sample(0.999_999), Move::Scissor);
    }

    #[test]
    fn test_sample_overflow_skips_empty_buckets() {
        let d = Distribution([0.3, 0.7, 0.0]);
        assert_eq!(d.sample(1.0), Move::Paper);
        assert_eq!(Distribution([1.0, 0.0, 0.0]).sample(1.5), Move::Rock);
        assert_eq!(Distribution::uniform().sample(1.0), Move::Scissor);
    }

    #[test]
    fn test_uniform_statistical() {
        let freq = frequencies(Difficulty::Easy, &[], false, 42);
        for f in freq {
            assert!(f > 0.31 && f < 0.356, "frequency {} not ~1/3", f);
        }
    }

    #[test]
    fn test_rock_history_favours_paper_statistical() {
        let history = [Move::Rock; 10];
        let easy = frequencies(Difficulty::Easy, &history, false, 7);
        let hard = frequencies(Difficulty::Hard, &history, false, 7);

        let paper = Move::Paper.index();
        // Easy expects ~0.483, Hard ~0.683
        assert!(easy[paper] > 0.44, "easy paper frequency {}", easy[paper]);
        assert!(hard[paper] > 0.64, "hard paper frequency {}", hard[paper]);
        assert!(hard[paper] > easy[paper] + 0.1);
    }

    #[test]
    fn test_choose_always_valid() {
        let mut rng = SeededRng::new(3);
        let history = [Move::Paper, Move::Scissor, Move::Scissor];
        for d in Difficulty::ALL {
            for fast in [false, true] {
                for _ in 0..200 {
                    let m = choose_bot_move(d, &history, fast, &mut rng);
                    assert!(Move::ALL.contains(&m));
                }
            }
        }
    }

    #[test]
    fn test_describe_difficulty() {
        assert!(describe_difficulty(Difficulty::Hard).contains("18 damage"));
        assert!(!describe_difficulty(Difficulty::Easy).contains("snap"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn any_history() -> impl Strategy<Value = Vec<Move>> {
            prop::collection::vec(prop::sample::select(Move::ALL.to_vec()), 0..=10)
        }

        fn any_difficulty() -> impl Strategy<Value = Difficulty> {
            prop::sample::select(Difficulty::ALL.to_vec())
        }

        proptest! {
            #[test]
            fn prop_distribution_is_valid(
                d in any_difficulty(),
                history in any_history(),
                fast in any::<bool>(),
            ) {
                let probs = move_distribution(d, &history, fast);
                let total: f64 = probs.0.iter().sum();
                prop_assert!((total - 1.0).abs() < 1e-9);
                prop_assert!(probs.0.iter().all(|&p| p >= 0.0));
            }

            #[test]
            fn prop_counter_gets_most_mass(d in any_difficulty(), history in any_history()) {
                if let Some(fav) = most_frequent(&history) {
                    let probs = move_distribution(d, &history, false);
                    let target = counter(fav);
                    for m in Move::ALL {
                        if m != target {
                            prop_assert!(probs.prob(target) > probs.prob(m));
                        }
                    }
                }
            }
        }
    }
}
