//! Built-in starter lesson.

use match_engine::{LessonDraft, PairDraft};

const STARTER_WORDS: &[(&str, &str, &str, &str)] = &[
    ("🍎", "りんご", "ringo", "apple"),
    ("🐱", "ねこ", "neko", "cat"),
    ("🐶", "いぬ", "inu", "dog"),
    ("🌸", "さくら", "sakura", "cherry blossom"),
    ("🗻", "やま", "yama", "mountain"),
    ("🚗", "くるま", "kuruma", "car"),
];

/// Draft for the lesson seeded on first launch.
pub fn starter_lesson() -> LessonDraft {
    LessonDraft::New {
        name: "はじめての単語 (First words)".to_string(),
        description: Some("Everyday nouns to get started".to_string()),
        pairs: STARTER_WORDS
            .iter()
            .map(|(image, term, reading, meaning)| PairDraft::new(*image, *term, *meaning).with_reading(*reading))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_lesson_is_valid() {
        let draft = starter_lesson();
        assert!(draft.validate().is_ok());
        let LessonDraft::New { pairs, .. } = draft else {
            panic!("expected new lesson");
        };
        assert_eq!(pairs.len(), STARTER_WORDS.len());
    }
}
