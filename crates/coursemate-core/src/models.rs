//! Core data models used throughout coursemate.
//!
//! These types represent the courses, lessons, content chunks, search
//! matches, and citations that flow through ingestion and retrieval.

use serde::{Deserialize, Serialize};

/// A single lesson inside a [`Course`].
///
/// Serialized into the course's catalog metadata at ingestion time, so the
/// field names here are part of the stored payload format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within its course.
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A course parsed from one document.
///
/// `title` is the course's identity: catalog records are keyed by it and
/// content chunks reference it by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub instructor: Option<String>,
    pub link: Option<String>,
    /// Lessons in ingestion order.
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Look up a lesson by number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }
}

/// A chunk of lesson text stored in the content collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    pub text: String,
    /// Title of the owning [`Course`].
    pub course_title: String,
    /// Owning lesson, or `None` for documents without lesson markers.
    pub lesson_number: Option<u32>,
    /// Position of this chunk within its course, contiguous from 0.
    pub chunk_index: usize,
}

/// One ranked hit from a content query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub text: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    /// Lower is more similar.
    pub distance: f32,
}

/// A user-facing reference to material that contributed to an answer.
///
/// Serializes as `{ "text": ..., "url": ... }`, the shape the HTTP API
/// returns in its `sources` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "text")]
    pub label: String,
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Citation {
    pub fn new(label: impl Into<String>, link: Option<String>) -> Self {
        Self {
            label: label.into(),
            link,
        }
    }
}
