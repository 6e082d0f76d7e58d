//! Lesson and pair models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifiers.
pub type LessonId = Uuid;
pub type PairId = Uuid;

/// One image and the word it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    /// Unique identifier, stable for the lifetime of the lesson.
    pub id: PairId,
    /// Image reference (file name, URL or emoji).
    pub image: String,
    /// Japanese term.
    pub term: String,
    /// Phonetic reading (kana or romaji).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    /// Meaning in the learner's language.
    pub meaning: String,
}

impl Pair {
    /// Create a new pair without a reading.
    pub fn new(image: impl Into<String>, term: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            image: image.into(),
            term: term.into(),
            reading: None,
            meaning: meaning.into(),
        }
    }

    /// Set reading.
    pub fn with_reading(mut self, reading: impl Into<String>) -> Self {
        self.reading = non_blank(reading.into());
        self
    }
}

/// A named, ordered set of pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub pairs: Vec<Pair>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    /// Create an empty lesson.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            pairs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a pair.
    pub fn with_pair(mut self, pair: Pair) -> Self {
        self.pairs.push(pair);
        self
    }

    pub fn contains(&self, id: PairId) -> bool {
        self.pairs.iter().any(|p| p.id == id)
    }
}

/// Form input for a pair that does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairDraft {
    pub image: String,
    pub term: String,
    pub reading: String,
    pub meaning: String,
}

impl PairDraft {
    pub fn new(image: impl Into<String>, term: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            term: term.into(),
            reading: String::new(),
            meaning: meaning.into(),
        }
    }

    pub fn with_reading(mut self, reading: impl Into<String>) -> Self {
        self.reading = reading.into();
        self
    }

    fn validate(&self, index: usize) -> Result<(), DraftError> {
        if self.image.trim().is_empty() {
            return Err(DraftError::EmptyImage { index });
        }
        if self.term.trim().is_empty() {
            return Err(DraftError::EmptyTerm { index });
        }
        if self.meaning.trim().is_empty() {
            return Err(DraftError::EmptyMeaning { index });
        }
        Ok(())
    }

    fn into_pair(self) -> Pair {
        Pair::new(self.image.trim(), self.term.trim(), self.meaning.trim()).with_reading(self.reading.trim())
    }
}

/// A pair in an edited lesson: either kept (possibly modified) or newly added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairEntry {
    Existing(Pair),
    New(PairDraft),
}

impl PairEntry {
    fn validate(&self, index: usize) -> Result<(), DraftError> {
        match self {
            Self::Existing(pair) => PairDraft {
                image: pair.image.clone(),
                term: pair.term.clone(),
                reading: String::new(),
                meaning: pair.meaning.clone(),
            }
            .validate(index),
            Self::New(draft) => draft.validate(index),
        }
    }

    fn into_pair(self) -> Pair {
        match self {
            Self::Existing(pair) => pair,
            Self::New(draft) => draft.into_pair(),
        }
    }
}

/// Lesson form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonDraft {
    /// Create a lesson with freshly generated ids.
    New {
        name: String,
        description: Option<String>,
        pairs: Vec<PairDraft>,
    },
    /// Overwrite an existing lesson in place.
    Edit {
        id: LessonId,
        name: String,
        description: Option<String>,
        pairs: Vec<PairEntry>,
    },
}

impl LessonDraft {
    /// Start editing an existing lesson, keeping all of its pairs.
    pub fn edit(lesson: &Lesson) -> Self {
        Self::Edit {
            id: lesson.id,
            name: lesson.name.clone(),
            description: lesson.description.clone(),
            pairs: lesson.pairs.iter().cloned().map(PairEntry::Existing).collect(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::New { name, .. } | Self::Edit { name, .. } => name,
        }
    }

    /// Check that every required field is filled in.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name().trim().is_empty() {
            return Err(DraftError::EmptyName);
        }
        match self {
            Self::New { pairs, .. } => pairs.iter().enumerate().try_for_each(|(i, p)| p.validate(i)),
            Self::Edit { pairs, .. } => pairs.iter().enumerate().try_for_each(|(i, p)| p.validate(i)),
        }
    }

    /// Apply the draft to a lesson collection and return the stored lesson.
    ///
    /// New lessons are appended; edits replace the lesson with the same id
    /// and keep its creation time.
    pub fn apply_to(self, lessons: &mut Vec<Lesson>, now: DateTime<Utc>) -> Result<Lesson, DraftError> {
        self.validate()?;

        match self {
            Self::New { name, description, pairs } => {
                let lesson = Lesson {
                    id: Uuid::new_v4(),
                    name: name.trim().to_string(),
                    description: description.and_then(non_blank),
                    pairs: pairs.into_iter().map(PairDraft::into_pair).collect(),
                    created_at: now,
                    updated_at: now,
                };
                lessons.push(lesson.clone());
                Ok(lesson)
            }
            Self::Edit { id, name, description, pairs } => {
                let lesson = lessons
                    .iter_mut()
                    .find(|l| l.id == id)
                    .ok_or(DraftError::UnknownLesson(id))?;
                lesson.name = name.trim().to_string();
                lesson.description = description.and_then(non_blank);
                lesson.pairs = pairs.into_iter().map(PairEntry::into_pair).collect();
                lesson.updated_at = now;
                Ok(lesson.clone())
            }
        }
    }
}

/// Invalid lesson form input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("lesson name is empty")]
    EmptyName,
    #[error("pair {index} has no image")]
    EmptyImage { index: usize },
    #[error("pair {index} has no term")]
    EmptyTerm { index: usize },
    #[error("pair {index} has no meaning")]
    EmptyMeaning { index: usize },
    #[error("no lesson with id {0}")]
    UnknownLesson(LessonId),
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fruit_draft() -> LessonDraft {
        LessonDraft::New {
            name: "Fruit".to_string(),
            description: Some("  ".to_string()),
            pairs: vec![
                PairDraft::new("🍎", "りんご", "apple").with_reading("ringo"),
                PairDraft::new("🍌", "バナナ", "banana"),
            ],
        }
    }

    #[test]
    fn test_new_draft_creates_lesson() {
        let mut lessons = Vec::new();
        let lesson = fruit_draft().apply_to(&mut lessons, Utc::now()).unwrap();

        assert_eq!(lessons.len(), 1);
        assert_eq!(lesson.name, "Fruit");
        assert_eq!(lesson.description, None);
        assert_eq!(lesson.pairs[0].reading.as_deref(), Some("ringo"));
        assert_eq!(lesson.pairs[1].reading, None);
        assert_ne!(lesson.pairs[0].id, lesson.pairs[1].id);
    }

    #[test]
    fn test_edit_keeps_pair_ids_and_created_at() {
        let mut lessons = Vec::new();
        let created = fruit_draft().apply_to(&mut lessons, Utc::now()).unwrap();
        let kept_id = created.pairs[0].id;

        let LessonDraft::Edit { id, description, mut pairs, .. } = LessonDraft::edit(&created) else {
            panic!("expected edit draft");
        };
        pairs.remove(1);
        pairs.push(PairEntry::New(PairDraft::new("🍇", "ぶどう", "grapes")));
        let later = created.created_at + chrono::Duration::seconds(5);
        let edited = LessonDraft::Edit { id, name: "Fruit 2".to_string(), description, pairs }
            .apply_to(&mut lessons, later)
            .unwrap();

        assert_eq!(lessons.len(), 1);
        assert_eq!(edited.name, "Fruit 2");
        assert_eq!(edited.pairs[0].id, kept_id);
        assert_eq!(edited.pairs[1].term, "ぶどう");
        assert_eq!(edited.created_at, created.created_at);
        assert_eq!(edited.updated_at, later);
    }

    #[test]
    fn test_validation_errors() {
        let draft = LessonDraft::New { name: " ".to_string(), description: None, pairs: vec![] };
        assert_eq!(draft.validate(), Err(DraftError::EmptyName));

        let draft = LessonDraft::New {
            name: "Animals".to_string(),
            description: None,
            pairs: vec![PairDraft::new("🐱", "ねこ", "cat"), PairDraft::new("🐶", "", "dog")],
        };
        assert_eq!(draft.validate(), Err(DraftError::EmptyTerm { index: 1 }));

        let missing = Uuid::new_v4();
        let draft = LessonDraft::Edit { id: missing, name: "x".to_string(), description: None, pairs: vec![] };
        assert_eq!(draft.apply_to(&mut Vec::new(), Utc::now()), Err(DraftError::UnknownLesson(missing)));
    }

    #[test]
    fn test_lesson_json_uses_epoch_millis() {
        let lesson = Lesson::new("Colors").with_pair(Pair::new("🔴", "あか", "red"));
        let json = serde_json::to_value(&lesson).unwrap();

        assert_eq!(json["createdAt"], serde_json::json!(lesson.created_at.timestamp_millis()));
        assert!(json["pairs"][0].get("reading").is_none());

        let back: Lesson = serde_json::from_value(json).unwrap();
        assert_eq!(back.pairs, lesson.pairs);
    }
}
