//! Lesson content as delivered by the lesson service.
//!
//! The voice core only reads this: vocabulary and the story feed the
//! tutor's grounding text. Generation and persistence live elsewhere.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One generated language lesson
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: LessonContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonContent {
    pub vocabulary: Vec<VocabEntry>,
    #[serde(default)]
    pub phrases: Vec<Phrase>,
    #[serde(default)]
    pub dialogue: Vec<DialogueTurn>,
    /// The reading passage, when the lesson has one
    pub story: Option<Vec<StoryParagraph>>,
    #[serde(default)]
    pub cultural_note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabEntry {
    pub word: String,
    pub translation: String,
    #[serde(default)]
    pub pronunciation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phrase {
    pub phrase: String,
    pub translation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub translation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryParagraph {
    pub text: String,
    #[serde(default)]
    pub translation: String,
}

impl Lesson {
    /// Load a lesson from a JSON file (as exported by the lesson service).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lesson file: {:?}", path))?;

        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse lesson file: {:?}", path))
    }
}
