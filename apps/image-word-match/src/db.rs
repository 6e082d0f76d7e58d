//! Lesson storage and result history.
//!
//! Lessons live as one JSON array under a fixed key in a small key/value
//! table. Finished games go to their own table so a lesson can show its
//! best score.

use chrono::{DateTime, Utc};
use match_engine::{DraftError, GameResult, Lesson, LessonDraft, LessonId};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Storage key for the lesson list.
pub const LESSONS_KEY: &str = "image_word_lessons";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid lesson: {0}")]
    Draft(#[from] DraftError),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// A finished game as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub id: Uuid,
    pub lesson_id: LessonId,
    pub result: GameResult,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> DbResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS game_results (
                id TEXT PRIMARY KEY,
                lesson_id TEXT NOT NULL,
                total_pairs INTEGER NOT NULL,
                correct_matches INTEGER NOT NULL,
                wrong_attempts INTEGER NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                score INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_lesson ON game_results(lesson_id);
            "#,
        )?;
        Ok(())
    }

    // Key/value blobs

    pub fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_value(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // Lesson operations

    pub fn load_lessons(&self) -> DbResult<Vec<Lesson>> {
        match self.get_value(LESSONS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save_lessons(&self, lessons: &[Lesson]) -> DbResult<()> {
        let json = serde_json::to_string(lessons)?;
        self.set_value(LESSONS_KEY, &json)
    }

    pub fn get_lesson(&self, id: LessonId) -> DbResult<Option<Lesson>> {
        Ok(self.load_lessons()?.into_iter().find(|l| l.id == id))
    }

    /// Create or overwrite a lesson from form input.
    pub fn save_draft(&self, draft: LessonDraft) -> DbResult<Lesson> {
        let mut lessons = self.load_lessons()?;
        let lesson = draft.apply_to(&mut lessons, Utc::now())?;
        self.save_lessons(&lessons)?;
        info!(lesson = %lesson.id, name = %lesson.name, pairs = lesson.pairs.len(), "lesson saved");
        Ok(lesson)
    }

    pub fn delete_lesson(&self, id: LessonId) -> DbResult<()> {
        let mut lessons = self.load_lessons()?;
        let before = lessons.len();
        lessons.retain(|l| l.id != id);
        if lessons.len() == before {
            return Err(DbError::NotFound(format!("lesson {id}")));
        }
        self.save_lessons(&lessons)?;
        self.conn.execute("DELETE FROM game_results WHERE lesson_id = ?1", params![id.to_string()])?;
        info!(lesson = %id, "lesson deleted");
        Ok(())
    }

    // Result operations

    pub fn insert_result(&self, lesson_id: LessonId, result: &GameResult) -> DbResult<ResultRecord> {
        let record = ResultRecord {
            id: Uuid::new_v4(),
            lesson_id,
            result: result.clone(),
        };
        self.conn.execute(
            "INSERT INTO game_results
                (id, lesson_id, total_pairs, correct_matches, wrong_attempts, elapsed_ms, score, accuracy, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id.to_string(),
                lesson_id.to_string(),
                result.total_pairs,
                result.correct_matches,
                result.wrong_attempts,
                result.elapsed_ms,
                result.score,
                result.accuracy,
                result.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(record)
    }

    /// Highest score for a lesson; ties go to the faster game.
    pub fn best_result(&self, lesson_id: LessonId) -> DbResult<Option<ResultRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM game_results WHERE lesson_id = ?1
             ORDER BY score DESC, elapsed_ms ASC LIMIT 1",
        )?;
        let record = stmt.query_row(params![lesson_id.to_string()], parse_result_row).optional()?;
        Ok(record)
    }

    /// Most recent games first.
    pub fn recent_results(&self, lesson_id: LessonId, limit: usize) -> DbResult<Vec<ResultRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM game_results WHERE lesson_id = ?1
             ORDER BY completed_at DESC LIMIT ?2",
        )?;
        let records = stmt
            .query_map(params![lesson_id.to_string(), limit as i64], parse_result_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(records)
    }
}

fn parse_uuid(s: &str) -> SqlResult<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_result_row(row: &rusqlite::Row) -> SqlResult<ResultRecord> {
    let id_str: String = row.get("id")?;
    let lesson_str: String = row.get("lesson_id")?;
    let completed_str: String = row.get("completed_at")?;

    Ok(ResultRecord {
        id: parse_uuid(&id_str)?,
        lesson_id: parse_uuid(&lesson_str)?,
        result: GameResult {
            total_pairs: row.get("total_pairs")?,
            correct_matches: row.get("correct_matches")?,
            wrong_attempts: row.get("wrong_attempts")?,
            elapsed_ms: row.get("elapsed_ms")?,
            score: row.get("score")?,
            accuracy: row.get("accuracy")?,
            completed_at: DateTime::parse_from_rfc3339(&completed_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use match_engine::{PairDraft, PairEntry};

    fn animals() -> LessonDraft {
        LessonDraft::New {
            name: "Animals".to_string(),
            description: Some("どうぶつ".to_string()),
            pairs: vec![
                PairDraft::new("🐱", "ねこ", "cat").with_reading("neko"),
                PairDraft::new("🐶", "いぬ", "dog").with_reading("inu"),
            ],
        }
    }

    fn result(score: u32, elapsed_ms: i64, completed_at: DateTime<Utc>) -> GameResult {
        GameResult {
            total_pairs: 2,
            correct_matches: 2,
            wrong_attempts: 0,
            elapsed_ms,
            score,
            accuracy: 100,
            completed_at,
        }
    }

    #[test]
    fn test_lesson_crud() {
        let db = Database::in_memory().unwrap();
        assert!(db.load_lessons().unwrap().is_empty());

        let lesson = db.save_draft(animals()).unwrap();
        let loaded = db.get_lesson(lesson.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Animals");
        assert_eq!(loaded.pairs, lesson.pairs);

        let LessonDraft::Edit { id, name, description, mut pairs } = LessonDraft::edit(&loaded) else {
            panic!("expected edit draft");
        };
        pairs.push(PairEntry::New(PairDraft::new("🐦", "とり", "bird")));
        db.save_draft(LessonDraft::Edit { id, name, description, pairs }).unwrap();
        assert_eq!(db.get_lesson(lesson.id).unwrap().unwrap().pairs.len(), 3);

        db.delete_lesson(lesson.id).unwrap();
        assert!(db.load_lessons().unwrap().is_empty());
        assert!(matches!(db.delete_lesson(lesson.id), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_lessons_stored_under_fixed_key() {
        let db = Database::in_memory().unwrap();
        db.save_draft(animals()).unwrap();

        let raw = db.get_value(LESSONS_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["pairs"][0]["term"], "ねこ");
    }

    #[test]
    fn test_invalid_draft_is_rejected() {
        let db = Database::in_memory().unwrap();
        let draft = LessonDraft::New { name: String::new(), description: None, pairs: vec![] };
        assert!(matches!(db.save_draft(draft), Err(DbError::Draft(DraftError::EmptyName))));
        assert!(db.get_value(LESSONS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let db = Database::in_memory().unwrap();
        db.set_value(LESSONS_KEY, "{not json").unwrap();
        assert!(matches!(db.load_lessons(), Err(DbError::Json(_))));
    }

    #[test]
    fn test_result_history() {
        let db = Database::in_memory().unwrap();
        let lesson = db.save_draft(animals()).unwrap();
        let now = Utc::now();

        db.insert_result(lesson.id, &result(210, 20_000, now - Duration::minutes(2))).unwrap();
        db.insert_result(lesson.id, &result(225, 9_000, now - Duration::minutes(1))).unwrap();
        let latest = db.insert_result(lesson.id, &result(225, 12_000, now)).unwrap();

        let best = db.best_result(lesson.id).unwrap().unwrap();
        assert_eq!(best.result.score, 225);
        assert_eq!(best.result.elapsed_ms, 9_000);

        let recent = db.recent_results(lesson.id, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, latest.id);

        assert!(db.best_result(Uuid::new_v4()).unwrap().is_none());

        db.delete_lesson(lesson.id).unwrap();
        assert!(db.recent_results(lesson.id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lessons.db");

        let id = {
            let db = Database::open(&path).unwrap();
            db.save_draft(animals()).unwrap().id
        };

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_lesson(id).unwrap().unwrap().pairs.len(), 2);
    }
}
