//! Score and accuracy for a finished game.

use serde::{Deserialize, Serialize};

/// Scoring constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Points per correct match.
    pub points_per_match: u32,
    /// Points lost per wrong attempt.
    pub wrong_penalty: u32,
    /// Games finished faster than this earn a time bonus.
    pub bonus_window_ms: i64,
    /// Bonus points per second left in the window.
    pub bonus_points_per_second: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            points_per_match: 100,
            wrong_penalty: 10,
            bonus_window_ms: 60_000,
            bonus_points_per_second: 0.5,
        }
    }
}

impl ScoringRules {
    /// Bonus for finishing inside the bonus window, floored to whole points.
    pub fn time_bonus(&self, elapsed_ms: i64) -> u32 {
        let elapsed_ms = elapsed_ms.max(0);
        if elapsed_ms >= self.bonus_window_ms {
            return 0;
        }
        let remaining = (self.bonus_window_ms - elapsed_ms) as f64;
        (remaining * self.bonus_points_per_second / 1000.0).floor().max(0.0) as u32
    }

    /// Never negative.
    pub fn score(&self, correct_matches: u32, wrong_attempts: u32, elapsed_ms: i64) -> u32 {
        let base = i64::from(correct_matches) * i64::from(self.points_per_match);
        let penalty = i64::from(wrong_attempts) * i64::from(self.wrong_penalty);
        let total = base - penalty + i64::from(self.time_bonus(elapsed_ms));
        total.clamp(0, i64::from(u32::MAX)) as u32
    }
}

/// [`ScoringRules::time_bonus`] with the default rules.
pub fn time_bonus(elapsed_ms: i64) -> u32 {
    ScoringRules::default().time_bonus(elapsed_ms)
}

/// [`ScoringRules::score`] with the default rules.
pub fn score(correct_matches: u32, wrong_attempts: u32, elapsed_ms: i64) -> u32 {
    ScoringRules::default().score(correct_matches, wrong_attempts, elapsed_ms)
}

/// Correct matches as a rounded percentage of all pairs.
pub fn accuracy(correct_matches: u32, total_pairs: u32) -> u32 {
    if total_pairs == 0 {
        return 0;
    }
    (100.0 * f64::from(correct_matches) / f64::from(total_pairs)).round() as u32
}
