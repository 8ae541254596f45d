//! Course retrieval facade over a [`VectorIndex`].
//!
//! Courses live in two collections:
//!
//! | Collection | Record id | Embedded text | Metadata |
//! |------------|-----------|---------------|----------|
//! | `course_catalog` | course title | course title | `title`, `instructor`, `course_link`, `lessons`, `lesson_count` |
//! | `course_content` | `<title_with_underscores>_<chunk_index>` | chunk text | `course_title`, `lesson_number`, `chunk_index` |
//!
//! Content search is two-phase: an optional course name is first resolved
//! against the catalog by nearest neighbor, then the content collection is
//! queried with a metadata filter built from the resolved title and lesson.

use std::sync::Arc;

use anyhow::{Context, Result};
use coursemate_core::document::ParsedCourse;
use coursemate_core::index::{IndexHit, IndexRecord, MetadataFilter, VectorIndex};
use coursemate_core::models::{ContentChunk, Course, Lesson, SearchMatch};
use serde_json::{json, Map, Value};
use tracing::debug;

pub const CATALOG_COLLECTION: &str = "course_catalog";
pub const CONTENT_COLLECTION: &str = "course_content";

/// Outcome of a content search.
///
/// `CourseNotFound` never carries matches: when a course name was given
/// and could not be resolved, no content query is issued at all.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResults {
    /// Matches in ascending distance order. May be empty.
    Found(Vec<SearchMatch>),
    CourseNotFound { query: String },
}

pub struct CourseStore {
    index: Arc<dyn VectorIndex>,
    max_results: usize,
}

impl CourseStore {
    pub fn new(index: Arc<dyn VectorIndex>, max_results: usize) -> Self {
        Self { index, max_results }
    }

    /// Store a parsed course: its catalog entry and all of its chunks.
    pub async fn add_course(&self, parsed: &ParsedCourse) -> Result<()> {
        self.add_course_metadata(&parsed.course).await?;
        self.add_course_content(&parsed.chunks).await
    }

    pub async fn add_course_metadata(&self, course: &Course) -> Result<()> {
        let lessons = serde_json::to_value(&course.lessons)?;
        let metadata = json!({
            "title": course.title,
            "instructor": course.instructor,
            "course_link": course.link,
            "lessons": lessons,
            "lesson_count": course.lessons.len(),
        });
        let record = IndexRecord {
            id: course.title.clone(),
            document: course.title.clone(),
            metadata: into_map(metadata),
        };
        self.index.upsert(CATALOG_COLLECTION, &[record]).await
    }

    pub async fn add_course_content(&self, chunks: &[ContentChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let records: Vec<IndexRecord> = chunks
            .iter()
            .map(|chunk| {
                let mut metadata = Map::new();
                metadata.insert("course_title".into(), json!(chunk.course_title));
                if let Some(n) = chunk.lesson_number {
                    metadata.insert("lesson_number".into(), json!(n));
                }
                metadata.insert("chunk_index".into(), json!(chunk.chunk_index));
                IndexRecord {
                    id: format!(
                        "{}_{}",
                        chunk.course_title.replace(' ', "_"),
                        chunk.chunk_index
                    ),
                    document: chunk.text.clone(),
                    metadata,
                }
            })
            .collect();
        self.index.upsert(CONTENT_COLLECTION, &records).await
    }

    /// Map a possibly partial course name to a stored course title.
    ///
    /// The single nearest catalog entry is accepted whatever its distance.
    /// Returns `None` only when the catalog is empty.
    pub async fn resolve_course(&self, name: &str) -> Result<Option<String>> {
        let hits = self.index.query(CATALOG_COLLECTION, name, 1, None).await?;
        let resolved = hits.into_iter().next().map(|hit| {
            hit.metadata
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(hit.id)
        });
        debug!(query = name, resolved = ?resolved, "resolved course name");
        Ok(resolved)
    }

    /// Semantic content search, optionally restricted to a course and/or a
    /// lesson number. Returns at most `max_results` matches.
    pub async fn search_content(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        let course_title = match course_name {
            Some(name) => match self.resolve_course(name).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(SearchResults::CourseNotFound {
                        query: name.to_string(),
                    })
                }
            },
            None => None,
        };

        let filter = build_filter(course_title.as_deref(), lesson_number);
        let hits = self
            .index
            .query(CONTENT_COLLECTION, query, self.max_results, filter.as_ref())
            .await?;

        Ok(SearchResults::Found(
            hits.into_iter().map(search_match).collect(),
        ))
    }

    /// Resolve a course and read its catalog entry back, lessons sorted by
    /// number. `None` means the name could not be resolved.
    pub async fn get_course_outline(&self, course_name: &str) -> Result<Option<Course>> {
        let title = match self.resolve_course(course_name).await? {
            Some(title) => title,
            None => return Ok(None),
        };
        let mut course = match self.course(&title).await? {
            Some(course) => course,
            None => return Ok(None),
        };
        course.lessons.sort_by_key(|l| l.number);
        Ok(Some(course))
    }

    /// Link of one lesson, by exact course title.
    pub async fn get_lesson_link(
        &self,
        course_title: &str,
        lesson_number: u32,
    ) -> Result<Option<String>> {
        Ok(self
            .course(course_title)
            .await?
            .and_then(|c| c.lesson(lesson_number).and_then(|l| l.link.clone())))
    }

    /// Catalog entry by exact title.
    pub async fn course(&self, title: &str) -> Result<Option<Course>> {
        match self.index.get(CATALOG_COLLECTION, title).await? {
            Some(record) => course_from_metadata(&record.id, &record.metadata).map(Some),
            None => Ok(None),
        }
    }

    pub async fn course_titles(&self) -> Result<Vec<String>> {
        self.index.ids(CATALOG_COLLECTION).await
    }

    pub async fn course_count(&self) -> Result<usize> {
        Ok(self.course_titles().await?.len())
    }
}

/// Course-only, lesson-only, both, or no filter.
pub fn build_filter(course_title: Option<&str>, lesson_number: Option<u32>) -> Option<MetadataFilter> {
    let mut filters = Vec::new();
    if let Some(title) = course_title {
        filters.push(MetadataFilter::eq("course_title", title));
    }
    if let Some(n) = lesson_number {
        filters.push(MetadataFilter::eq("lesson_number", n));
    }
    MetadataFilter::all(filters)
}

fn search_match(hit: IndexHit) -> SearchMatch {
    SearchMatch {
        course_title: hit
            .metadata
            .get("course_title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        lesson_number: hit
            .metadata
            .get("lesson_number")
            .and_then(Value::as_u64)
            .map(|n| n as u32),
        text: hit.document,
        distance: hit.distance,
    }
}

fn course_from_metadata(id: &str, metadata: &Map<String, Value>) -> Result<Course> {
    let text = |key: &str| {
        metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let lessons: Vec<Lesson> = match metadata.get("lessons") {
        Some(v) => serde_json::from_value(v.clone())
            .with_context(|| format!("Invalid lesson list in catalog entry '{}'", id))?,
        None => Vec::new(),
    };
    Ok(Course {
        title: text("title").unwrap_or_else(|| id.to_string()),
        instructor: text("instructor"),
        link: text("course_link"),
        lessons,
    })
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
