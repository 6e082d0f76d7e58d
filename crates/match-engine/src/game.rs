//! Matching game session state machine.
//!
//! A game goes from "no game" to in progress on [`MatchGame::start_game`] and
//! to complete once every pair is matched. Complete is terminal: only
//! [`MatchGame::start_game`] or [`MatchGame::reset_game`] leave it.

use crate::models::{Lesson, Pair, PairId};
use crate::scoring::{accuracy, ScoringRules};
use crate::shuffle::shuffle;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// How long a wrong attempt stays flagged.
pub const DEFAULT_WRONG_FLASH_MS: i64 = 500;

/// Upper bound for [`MatchGame::with_wrong_flash`].
pub const MAX_WRONG_FLASH_MS: i64 = 10_000;

/// Board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Image,
    Word,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Image => Self::Word,
            Self::Word => Self::Image,
        }
    }
}

/// What a selection call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// No game, game over, unknown id or already matched.
    Ignored,
    /// Recorded as the current selection for its column.
    Selected,
    /// Correct pair, game continues.
    Matched,
    /// Wrong pair.
    Mismatched,
    /// Correct pair and it was the last one.
    Completed,
}

/// The pair of cells from the last wrong attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongAttempt {
    pub image_id: PairId,
    pub word_id: PairId,
    pub expires_at: DateTime<Utc>,
}

impl WrongAttempt {
    /// Whether a cell on the given side belongs to this attempt.
    pub fn involves(&self, side: Side, id: PairId) -> bool {
        match side {
            Side::Image => self.image_id == id,
            Side::Word => self.word_id == id,
        }
    }
}

/// Final numbers of a completed game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub total_pairs: u32,
    pub correct_matches: u32,
    pub wrong_attempts: u32,
    pub elapsed_ms: i64,
    pub score: u32,
    /// Rounded percentage.
    pub accuracy: u32,
    pub completed_at: DateTime<Utc>,
}

impl GameResult {
    fn new(
        rules: &ScoringRules,
        total_pairs: u32,
        correct_matches: u32,
        wrong_attempts: u32,
        elapsed_ms: i64,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            total_pairs,
            correct_matches,
            wrong_attempts,
            elapsed_ms,
            score: rules.score(correct_matches, wrong_attempts, elapsed_ms),
            accuracy: accuracy(correct_matches, total_pairs),
            completed_at,
        }
    }
}

/// State of one game session.
#[derive(Debug, Clone)]
pub struct GameState {
    lesson: Lesson,
    image_order: Vec<Pair>,
    word_order: Vec<Pair>,
    selected_image: Option<PairId>,
    selected_word: Option<PairId>,
    matched: HashSet<PairId>,
    wrong_attempts: u32,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    is_complete: bool,
}

impl GameState {
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    /// Pairs in image column order.
    pub fn image_order(&self) -> &[Pair] {
        &self.image_order
    }

    /// Pairs in word column order.
    pub fn word_order(&self) -> &[Pair] {
        &self.word_order
    }

    /// Column contents for a side.
    pub fn column(&self, side: Side) -> &[Pair] {
        match side {
            Side::Image => &self.image_order,
            Side::Word => &self.word_order,
        }
    }

    pub fn selected_image(&self) -> Option<PairId> {
        self.selected_image
    }

    pub fn selected_word(&self) -> Option<PairId> {
        self.selected_word
    }

    pub fn selected(&self, side: Side) -> Option<PairId> {
        match side {
            Side::Image => self.selected_image,
            Side::Word => self.selected_word,
        }
    }

    pub fn matched(&self) -> &HashSet<PairId> {
        &self.matched
    }

    pub fn is_matched(&self, id: PairId) -> bool {
        self.matched.contains(&id)
    }

    pub fn wrong_attempts(&self) -> u32 {
        self.wrong_attempts
    }

    pub fn total_pairs(&self) -> usize {
        self.lesson.pairs.len()
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Time since start, frozen once the game is complete.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let end = self.ended_at.unwrap_or(now);
        end.signed_duration_since(self.started_at).max(Duration::zero())
    }

    fn set_selected(&mut self, side: Side, id: Option<PairId>) {
        match side {
            Side::Image => self.selected_image = id,
            Side::Word => self.selected_word = id,
        }
    }
}

/// Image-word matching game.
#[derive(Debug, Clone)]
pub struct MatchGame {
    rules: ScoringRules,
    wrong_flash: Duration,
    state: Option<GameState>,
    result: Option<GameResult>,
    wrong: Option<WrongAttempt>,
}

impl Default for MatchGame {
    fn default() -> Self {
        Self::new(ScoringRules::default())
    }
}

impl MatchGame {
    /// Create an engine with no game running.
    pub fn new(rules: ScoringRules) -> Self {
        Self {
            rules,
            wrong_flash: Duration::milliseconds(DEFAULT_WRONG_FLASH_MS),
            state: None,
            result: None,
            wrong: None,
        }
    }

    /// Set how long a wrong attempt stays flagged, clamped to
    /// `0..=MAX_WRONG_FLASH_MS`.
    pub fn with_wrong_flash(mut self, flash: Duration) -> Self {
        self.wrong_flash = flash.clamp(Duration::zero(), Duration::milliseconds(MAX_WRONG_FLASH_MS));
        self
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    /// Whether a game exists and is still being played.
    pub fn in_progress(&self) -> bool {
        self.state.as_ref().is_some_and(|s| !s.is_complete)
    }

    /// Start a new game. Returns `false` and changes nothing when the lesson
    /// has no pairs or repeats a pair id.
    pub fn start_game(&mut self, lesson: Lesson) -> bool {
        self.start_game_with(lesson, &mut rand::rng(), Utc::now())
    }

    /// [`start_game`](Self::start_game) with an explicit RNG and clock.
    pub fn start_game_with<R: Rng + ?Sized>(&mut self, lesson: Lesson, rng: &mut R, now: DateTime<Utc>) -> bool {
        if lesson.pairs.is_empty() {
            debug!(lesson = %lesson.id, "refusing to start game for empty lesson");
            return false;
        }
        let unique: HashSet<PairId> = lesson.pairs.iter().map(|p| p.id).collect();
        if unique.len() != lesson.pairs.len() {
            debug!(lesson = %lesson.id, "refusing to start game for lesson with duplicate pair ids");
            return false;
        }

        // Two independent draws so the columns do not line up.
        let image_order = shuffle(&lesson.pairs, rng);
        let word_order = shuffle(&lesson.pairs, rng);

        info!(lesson = %lesson.id, pairs = lesson.pairs.len(), "game started");
        self.result = None;
        self.wrong = None;
        self.state = Some(GameState {
            lesson,
            image_order,
            word_order,
            selected_image: None,
            selected_word: None,
            matched: HashSet::new(),
            wrong_attempts: 0,
            started_at: now,
            ended_at: None,
            is_complete: false,
        });
        true
    }

    /// Drop the current game and its result.
    pub fn reset_game(&mut self) {
        self.state = None;
        self.result = None;
        self.wrong = None;
    }

    pub fn select_image(&mut self, id: PairId) -> SelectOutcome {
        self.select_at(Side::Image, id, Utc::now())
    }

    pub fn select_word(&mut self, id: PairId) -> SelectOutcome {
        self.select_at(Side::Word, id, Utc::now())
    }

    pub fn select_image_at(&mut self, id: PairId, now: DateTime<Utc>) -> SelectOutcome {
        self.select_at(Side::Image, id, now)
    }

    pub fn select_word_at(&mut self, id: PairId, now: DateTime<Utc>) -> SelectOutcome {
        self.select_at(Side::Word, id, now)
    }

    /// Select a cell on either side.
    pub fn select_at(&mut self, side: Side, id: PairId, now: DateTime<Utc>) -> SelectOutcome {
        let Some(state) = self.state.as_mut() else {
            return SelectOutcome::Ignored;
        };
        if state.is_complete || state.matched.contains(&id) || !state.lesson.contains(id) {
            return SelectOutcome::Ignored;
        }

        let Some(other) = state.selected(side.opposite()) else {
            debug!(?side, pair = %id, "selected");
            state.set_selected(side, Some(id));
            return SelectOutcome::Selected;
        };

        let (image_id, word_id) = match side {
            Side::Image => (id, other),
            Side::Word => (other, id),
        };
        state.selected_image = None;
        state.selected_word = None;

        if image_id != word_id {
            state.wrong_attempts += 1;
            debug!(image = %image_id, word = %word_id, wrong = state.wrong_attempts, "wrong match");
            self.wrong = Some(WrongAttempt {
                image_id,
                word_id,
                expires_at: now.checked_add_signed(self.wrong_flash).unwrap_or(now),
            });
            return SelectOutcome::Mismatched;
        }

        state.matched.insert(id);
        debug!(pair = %id, matched = state.matched.len(), "matched");
        if state.matched.len() < state.lesson.pairs.len() {
            return SelectOutcome::Matched;
        }

        state.ended_at = Some(now);
        state.is_complete = true;
        let total = state.lesson.pairs.len() as u32;
        let result = GameResult::new(
            &self.rules,
            total,
            state.matched.len() as u32,
            state.wrong_attempts,
            state.elapsed(now).num_milliseconds(),
            now,
        );
        info!(
            lesson = %state.lesson.id,
            score = result.score,
            wrong = result.wrong_attempts,
            elapsed_ms = result.elapsed_ms,
            "game complete"
        );
        self.result = Some(result);
        SelectOutcome::Completed
    }

    /// The last wrong attempt, if it has not expired yet.
    pub fn wrong_attempt(&self) -> Option<WrongAttempt> {
        self.wrong_attempt_at(Utc::now())
    }

    pub fn wrong_attempt_at(&self, now: DateTime<Utc>) -> Option<WrongAttempt> {
        self.wrong.filter(|w| now < w.expires_at)
    }

    /// Clear an expired wrong attempt.
    pub fn tick(&mut self) {
        self.tick_at(Utc::now());
    }

    pub fn tick_at(&mut self, now: DateTime<Utc>) {
        if self.wrong.is_some_and(|w| now >= w.expires_at) {
            self.wrong = None;
        }
    }
}
