//! Application state and logic.

use crate::config::Config;
use crate::db::{Database, DbResult, ResultRecord};
use crate::sample;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use match_engine::{Lesson, LessonDraft, LessonId, MatchGame, PairDraft, PairEntry, SelectOutcome, Side};
use std::collections::HashMap;
use std::fmt::Display;
use tracing::warn;

/// Games shown under the result screen.
const HISTORY_LEN: usize = 5;

pub struct App {
    pub db: Database,
    pub config: Config,
    pub view: View,
    pub lessons: Vec<Lesson>,
    pub selected_lesson: usize,
    pub best_scores: HashMap<LessonId, u32>,
    pub game: MatchGame,
    pub focus: Side,
    pub image_cursor: usize,
    pub word_cursor: usize,
    pub history: Vec<ResultRecord>,
    pub editor_lesson: Option<LessonId>,
    pub selected_pair: usize,
    pub editing: bool,
    pub input_buffer: String,
    pub input_field: InputField,
    pub pending_pair: PairDraft,
    pub message: Option<String>,
    pub show_help: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    LessonList,
    Play,
    Result,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    LessonName,
    LessonRename,
    LessonDescription,
    PairImage,
    PairTerm,
    PairReading,
    PairMeaning,
}

impl InputField {
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::LessonName => "New lesson name",
            Self::LessonRename => "Rename lesson",
            Self::LessonDescription => "Description (optional)",
            Self::PairImage => "Image (file, URL or emoji)",
            Self::PairTerm => "Japanese term",
            Self::PairReading => "Reading (optional)",
            Self::PairMeaning => "Meaning",
        }
    }
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let db_path = Config::db_path().unwrap_or_else(|| "lessons.db".into());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&db_path)?;
        Ok(Self::with_database(db, config)?)
    }

    pub fn with_database(db: Database, config: Config) -> DbResult<Self> {
        let game = MatchGame::new(config.to_scoring_rules())
            .with_wrong_flash(config.wrong_flash());

        let mut app = Self {
            db,
            config,
            view: View::LessonList,
            lessons: Vec::new(),
            selected_lesson: 0,
            best_scores: HashMap::new(),
            game,
            focus: Side::Image,
            image_cursor: 0,
            word_cursor: 0,
            history: Vec::new(),
            editor_lesson: None,
            selected_pair: 0,
            editing: false,
            input_buffer: String::new(),
            input_field: InputField::None,
            pending_pair: PairDraft::default(),
            message: None,
            show_help: false,
        };

        app.refresh_lessons()?;
        if app.lessons.is_empty() && app.config.game.seed_sample_lesson {
            app.db.save_draft(sample::starter_lesson())?;
            app.refresh_lessons()?;
        }
        Ok(app)
    }

    pub fn refresh_lessons(&mut self) -> DbResult<()> {
        self.lessons = self.db.load_lessons()?;
        self.best_scores.clear();
        for lesson in &self.lessons {
            if let Ok(Some(best)) = self.db.best_result(lesson.id) {
                self.best_scores.insert(lesson.id, best.result.score);
            }
        }
        if self.selected_lesson >= self.lessons.len() {
            self.selected_lesson = self.lessons.len().saturating_sub(1);
        }
        Ok(())
    }

    pub fn can_quit(&self) -> bool {
        !self.editing && self.view == View::LessonList
    }

    pub fn selected_lesson(&self) -> Option<&Lesson> {
        self.lessons.get(self.selected_lesson)
    }

    pub fn editor_lesson(&self) -> Option<&Lesson> {
        let id = self.editor_lesson?;
        self.lessons.iter().find(|l| l.id == id)
    }

    pub fn cursor(&self, side: Side) -> usize {
        match side {
            Side::Image => self.image_cursor,
            Side::Word => self.word_cursor,
        }
    }

    /// Clear an expired wrong-match highlight.
    pub fn tick(&mut self) {
        self.game.tick();
    }

    /// Single sink for failures that must not interrupt play.
    fn report_error(&mut self, context: &str, err: impl Display) {
        warn!(error = %err, "{context}");
        self.message = Some(format!("{context}: {err}"));
    }

    fn reload(&mut self) {
        if let Err(e) = self.refresh_lessons() {
            self.report_error("Could not load lessons", e);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.message = None;

        if self.show_help {
            self.show_help = false;
            return;
        }

        if self.editing {
            self.handle_edit_key(key);
            return;
        }

        match self.view {
            View::LessonList => self.handle_list_key(key),
            View::Play => self.handle_play_key(key),
            View::Result => self.handle_result_key(key),
            View::Editor => self.handle_editor_key(key),
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.cancel_editing(),
            KeyCode::Enter => self.finish_editing(),
            KeyCode::Backspace => { self.input_buffer.pop(); }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.lessons.is_empty() {
                    self.selected_lesson = (self.selected_lesson + 1).min(self.lessons.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_lesson = self.selected_lesson.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(lesson) = self.selected_lesson().cloned() {
                    self.start_game(lesson);
                }
            }
            KeyCode::Char('a') => self.begin_input(InputField::LessonName, String::new()),
            KeyCode::Char('e') => {
                if let Some(id) = self.selected_lesson().map(|l| l.id) {
                    self.editor_lesson = Some(id);
                    self.selected_pair = 0;
                    self.view = View::Editor;
                }
            }
            KeyCode::Char('d') => self.delete_selected_lesson(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_play_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.focus = Side::Image,
            KeyCode::Char('l') | KeyCode::Right => self.focus = Side::Word,
            KeyCode::Tab => self.focus = self.focus.opposite(),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Enter | KeyCode::Char(' ') => self.select_at_cursor(),
            KeyCode::Char('r') => self.restart(),
            KeyCode::Char('q') | KeyCode::Esc => self.leave_game(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Enter => self.restart(),
            KeyCode::Char('q') | KeyCode::Esc => self.leave_game(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let pair_count = self.editor_lesson().map_or(0, |l| l.pairs.len());
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if pair_count > 0 {
                    self.selected_pair = (self.selected_pair + 1).min(pair_count - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_pair = self.selected_pair.saturating_sub(1);
            }
            KeyCode::Char('a') => {
                self.pending_pair = PairDraft::default();
                self.begin_input(InputField::PairImage, String::new());
            }
            KeyCode::Char('d') => self.delete_selected_pair(),
            KeyCode::Char('n') => {
                let name = self.editor_lesson().map(|l| l.name.clone()).unwrap_or_default();
                self.begin_input(InputField::LessonRename, name);
            }
            KeyCode::Char('i') => {
                let desc = self.editor_lesson().and_then(|l| l.description.clone()).unwrap_or_default();
                self.begin_input(InputField::LessonDescription, desc);
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.editor_lesson = None;
                self.view = View::LessonList;
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    // Game

    fn start_game(&mut self, lesson: Lesson) {
        let name = lesson.name.clone();
        let empty = lesson.pairs.is_empty();
        if !self.game.start_game(lesson) {
            self.message = Some(if empty {
                format!("'{name}' has no pairs yet. Press 'e' to add some.")
            } else {
                format!("'{name}' repeats a pair and cannot be played.")
            });
            return;
        }
        self.focus = Side::Image;
        self.image_cursor = 0;
        self.word_cursor = 0;
        self.history.clear();
        self.view = View::Play;
    }

    fn restart(&mut self) {
        if let Some(lesson) = self.game.state().map(|s| s.lesson().clone()) {
            self.start_game(lesson);
        }
    }

    fn leave_game(&mut self) {
        self.game.reset_game();
        self.history.clear();
        self.view = View::LessonList;
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.game.state().map_or(0, |s| s.total_pairs());
        if len == 0 {
            return;
        }
        let cursor = match self.focus {
            Side::Image => &mut self.image_cursor,
            Side::Word => &mut self.word_cursor,
        };
        *cursor = cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn select_at_cursor(&mut self) {
        let side = self.focus;
        let Some(id) = self
            .game
            .state()
            .and_then(|s| s.column(side).get(self.cursor(side)))
            .map(|p| p.id)
        else {
            return;
        };

        match self.game.select_at(side, id, Utc::now()) {
            SelectOutcome::Selected => self.focus = side.opposite(),
            SelectOutcome::Mismatched => self.message = Some("Not a match, try again".to_string()),
            SelectOutcome::Completed => self.finish_game(),
            SelectOutcome::Matched | SelectOutcome::Ignored => {}
        }
    }

    fn finish_game(&mut self) {
        let (Some(state), Some(result)) = (self.game.state(), self.game.result()) else {
            return;
        };
        let lesson_id = state.lesson().id;
        let result = result.clone();

        if let Err(e) = self.db.insert_result(lesson_id, &result) {
            self.report_error("Could not save result", e);
        }
        match self.db.recent_results(lesson_id, HISTORY_LEN) {
            Ok(history) => self.history = history,
            Err(e) => self.report_error("Could not load history", e),
        }
        let best = self.best_scores.entry(lesson_id).or_insert(0);
        *best = (*best).max(result.score);
        self.view = View::Result;
    }

    // Lesson management

    fn begin_input(&mut self, field: InputField, initial: String) {
        self.editing = true;
        self.input_field = field;
        self.input_buffer = initial;
    }

    fn cancel_editing(&mut self) {
        self.editing = false;
        self.input_buffer.clear();
        self.input_field = InputField::None;
        self.pending_pair = PairDraft::default();
    }

    fn finish_editing(&mut self) {
        let value = self.input_buffer.trim().to_string();
        let required = !matches!(
            self.input_field,
            InputField::PairReading | InputField::LessonDescription | InputField::None
        );
        if required && value.is_empty() {
            self.message = Some(format!("{} is required", self.input_field.prompt()));
            return;
        }

        match self.input_field {
            InputField::LessonName => self.create_lesson(value),
            InputField::LessonRename => {
                if self.update_editor_lesson(|name, _, _| *name = value) {
                    self.message = Some("Lesson renamed".to_string());
                }
            }
            InputField::LessonDescription => {
                // Blank clears it.
                if self.update_editor_lesson(|_, description, _| *description = Some(value)) {
                    self.message = Some("Description saved".to_string());
                }
            }
            InputField::PairImage => {
                self.pending_pair.image = value;
                self.begin_input(InputField::PairTerm, String::new());
                return;
            }
            InputField::PairTerm => {
                self.pending_pair.term = value;
                self.begin_input(InputField::PairReading, String::new());
                return;
            }
            InputField::PairReading => {
                self.pending_pair.reading = value;
                self.begin_input(InputField::PairMeaning, String::new());
                return;
            }
            InputField::PairMeaning => {
                self.pending_pair.meaning = value;
                let draft = std::mem::take(&mut self.pending_pair);
                if self.update_editor_lesson(|_, _, pairs| pairs.push(PairEntry::New(draft))) {
                    self.selected_pair = self.editor_lesson().map_or(0, |l| l.pairs.len().saturating_sub(1));
                    self.message = Some("Pair added".to_string());
                }
            }
            InputField::None => {}
        }
        self.cancel_editing();
    }

    fn create_lesson(&mut self, name: String) {
        let draft = LessonDraft::New { name, description: None, pairs: Vec::new() };
        match self.db.save_draft(draft) {
            Ok(lesson) => {
                self.reload();
                self.selected_lesson = self.lessons.iter().position(|l| l.id == lesson.id).unwrap_or(0);
                self.editor_lesson = Some(lesson.id);
                self.selected_pair = 0;
                self.view = View::Editor;
                self.message = Some("Lesson created. Press 'a' to add pairs.".to_string());
            }
            Err(e) => self.report_error("Could not create lesson", e),
        }
    }

    /// Apply a change to the lesson open in the editor and persist it.
    fn update_editor_lesson(
        &mut self,
        change: impl FnOnce(&mut String, &mut Option<String>, &mut Vec<PairEntry>),
    ) -> bool {
        let Some(lesson) = self.editor_lesson() else {
            return false;
        };
        let id = lesson.id;
        let mut name = lesson.name.clone();
        let mut description = lesson.description.clone();
        let mut pairs: Vec<PairEntry> = lesson.pairs.iter().cloned().map(PairEntry::Existing).collect();
        change(&mut name, &mut description, &mut pairs);

        match self.db.save_draft(LessonDraft::Edit { id, name, description, pairs }) {
            Ok(_) => {
                self.reload();
                true
            }
            Err(e) => {
                self.report_error("Could not save lesson", e);
                false
            }
        }
    }

    fn delete_selected_pair(&mut self) {
        let index = self.selected_pair;
        if self.editor_lesson().map_or(true, |l| index >= l.pairs.len()) {
            return;
        }
        if self.update_editor_lesson(|_, _, pairs| {
            pairs.remove(index);
        }) {
            let remaining = self.editor_lesson().map_or(0, |l| l.pairs.len());
            self.selected_pair = self.selected_pair.min(remaining.saturating_sub(1));
            self.message = Some("Pair deleted".to_string());
        }
    }

    fn delete_selected_lesson(&mut self) {
        let Some(lesson) = self.selected_lesson() else {
            return;
        };
        let (id, name) = (lesson.id, lesson.name.clone());
        match self.db.delete_lesson(id) {
            Ok(()) => {
                self.reload();
                self.message = Some(format!("Deleted '{name}'"));
            }
            Err(e) => self.report_error("Could not delete lesson", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::with_database(Database::in_memory().unwrap(), Config::default()).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::from(code));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
        press(app, KeyCode::Enter);
    }

    /// Move the cursor on `side` to the cell holding `index`-th lesson pair and select it.
    fn pick(app: &mut App, side: Side, index: usize) {
        let state = app.game.state().unwrap();
        let id = state.lesson().pairs[index].id;
        let row = state.column(side).iter().position(|p| p.id == id).unwrap();
        app.focus = side;
        match side {
            Side::Image => app.image_cursor = row,
            Side::Word => app.word_cursor = row,
        }
        press(app, KeyCode::Enter);
    }

    #[test]
    fn test_starter_lesson_seeded() {
        let app = app();
        assert_eq!(app.lessons.len(), 1);
        assert_eq!(app.lessons[0].pairs.len(), 6);
        assert!(app.can_quit());
    }

    #[test]
    fn test_no_seed_when_disabled() {
        let mut config = Config::default();
        config.game.seed_sample_lesson = false;
        let app = App::with_database(Database::in_memory().unwrap(), config).unwrap();
        assert!(app.lessons.is_empty());
    }

    #[test]
    fn test_full_game_through_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, View::Play);
        assert!(!app.can_quit());

        pick(&mut app, Side::Image, 0);
        assert_eq!(app.focus, Side::Word);
        pick(&mut app, Side::Word, 1);
        assert_eq!(app.game.state().unwrap().wrong_attempts(), 1);
        assert!(app.message.is_some());
        assert!(app.game.wrong_attempt().is_some());

        for i in 0..6 {
            pick(&mut app, Side::Word, i);
            pick(&mut app, Side::Image, i);
        }

        assert_eq!(app.view, View::Result);
        let result = app.game.result().unwrap();
        assert_eq!(result.wrong_attempts, 1);
        assert_eq!(result.accuracy, 100);
        assert_eq!(app.history.len(), 1);

        let lesson_id = app.lessons[0].id;
        assert_eq!(app.best_scores.get(&lesson_id), Some(&result.score));
        assert_eq!(app.db.best_result(lesson_id).unwrap().unwrap().result.score, result.score);

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.view, View::Play);
        assert!(app.game.result().is_none());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view, View::LessonList);
        assert!(app.game.state().is_none());
    }

    #[test]
    fn test_cursor_stays_in_column() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        for _ in 0..20 {
            press(&mut app, KeyCode::Char('j'));
        }
        assert_eq!(app.image_cursor, 5);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.word_cursor, 0);
    }

    #[test]
    fn test_create_lesson_and_add_pair() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Colors");
        assert_eq!(app.view, View::Editor);
        assert_eq!(app.lessons.len(), 2);

        // Empty lessons cannot be played.
        let colors = app.editor_lesson().unwrap().clone();
        app.start_game(colors);
        assert_eq!(app.view, View::Editor);
        assert!(app.message.as_deref().unwrap().contains("no pairs"));

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "🔴");
        type_text(&mut app, "あか");
        type_text(&mut app, "");
        type_text(&mut app, "red");
        assert!(!app.editing);

        let lesson = app.editor_lesson().unwrap();
        assert_eq!(lesson.pairs.len(), 1);
        assert_eq!(lesson.pairs[0].term, "あか");
        assert_eq!(lesson.pairs[0].reading, None);

        press(&mut app, KeyCode::Char('n'));
        app.input_buffer.clear();
        type_text(&mut app, "いろ");
        assert_eq!(app.editor_lesson().unwrap().name, "いろ");

        press(&mut app, KeyCode::Char('d'));
        assert!(app.editor_lesson().unwrap().pairs.is_empty());
    }

    #[test]
    fn test_edit_description() {
        let mut app = app();
        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.input_field, InputField::LessonDescription);
        assert!(!app.input_buffer.is_empty());

        app.input_buffer.clear();
        type_text(&mut app, "どうぶつ と たべもの");
        assert!(!app.editing);
        assert_eq!(app.editor_lesson().unwrap().description.as_deref(), Some("どうぶつ と たべもの"));
        assert_eq!(app.editor_lesson().unwrap().pairs.len(), 6);

        // A blank description is optional and clears the field.
        press(&mut app, KeyCode::Char('i'));
        app.input_buffer.clear();
        type_text(&mut app, "");
        assert!(!app.editing);
        assert_eq!(app.editor_lesson().unwrap().description, None);
    }

    #[test]
    fn test_extreme_wrong_flash_config() {
        for ms in [i64::MIN, -1, i64::MAX] {
            let mut config = Config::default();
            config.game.wrong_flash_ms = ms;
            let mut app = App::with_database(Database::in_memory().unwrap(), config).unwrap();
            press(&mut app, KeyCode::Enter);
            pick(&mut app, Side::Image, 0);
            pick(&mut app, Side::Word, 1);
            assert_eq!(app.game.state().unwrap().wrong_attempts(), 1);
            app.tick();
        }
    }

    #[test]
    fn test_required_field_keeps_prompt_open() {
        let mut app = app();
        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "   ");
        assert!(app.editing);
        assert_eq!(app.input_field, InputField::PairImage);

        press(&mut app, KeyCode::Esc);
        assert!(!app.editing);
        assert_eq!(app.editor_lesson().unwrap().pairs.len(), 6);
    }

    #[test]
    fn test_delete_lesson() {
        let mut app = app();
        press(&mut app, KeyCode::Char('d'));
        assert!(app.lessons.is_empty());
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view, View::LessonList);
    }
}
