//! # match-engine
//!
//! Engine for the image-word matching game used by the Japanese study apps.
//!
//! A [`Lesson`] is an ordered list of [`Pair`]s (image, term, reading, meaning).
//! [`MatchGame`] shuffles the pairs into an image column and a word column and
//! lets the player pair them up:
//!
//! - [`shuffle`] - Fisher-Yates permutation with an injected RNG
//! - [`ScoringRules`] - score and accuracy for a finished game
//! - [`MatchGame`] - the session state machine
//!
//! The engine performs no I/O. Persistence of lessons and results belongs to
//! the caller.

mod game;
mod models;
mod scoring;
mod shuffle;

pub use game::{GameResult, GameState, MatchGame, SelectOutcome, Side, WrongAttempt, DEFAULT_WRONG_FLASH_MS, MAX_WRONG_FLASH_MS};
pub use models::{DraftError, Lesson, LessonDraft, LessonId, Pair, PairDraft, PairEntry, PairId};
pub use scoring::{accuracy, score, time_bonus, ScoringRules};
pub use shuffle::shuffle;
