//! Course document parsing.
//!
//! A course document is plain text with a small header followed by lesson
//! sections:
//!
//! ```text
//! Course Title: Introduction to MCP
//! Course Link: https://example.com/mcp
//! Course Instructor: Jane Doe
//!
//! Lesson 1: Setup
//! Lesson Link: https://example.com/mcp/1
//! Lesson body text...
//!
//! Lesson 2: Transport
//! More text...
//! ```
//!
//! Header lines may appear in any order and only count before the first
//! lesson marker. A `Lesson Link:` line is recognised only as the first
//! non-blank line after a marker. Text before the first marker is ignored
//! when the document has lessons, and becomes lesson-less content when it
//! has none.

use crate::chunk::chunk_sentences;
use crate::models::{ContentChunk, Course, Lesson};

const TITLE_PREFIX: &str = "Course Title:";
const LINK_PREFIX: &str = "Course Link:";
const INSTRUCTOR_PREFIX: &str = "Course Instructor:";
const LESSON_LINK_PREFIX: &str = "Lesson Link:";

/// A parsed course and its content chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCourse {
    pub course: Course,
    pub chunks: Vec<ContentChunk>,
}

struct LessonSection<'a> {
    lesson: Lesson,
    body: Vec<&'a str>,
    expecting_link: bool,
}

/// Parse one course document.
///
/// `file_name` is the title used when the document has no `Course Title:`
/// header. Lessons whose body is blank are dropped from both the course and
/// the chunk list. The first chunk of each lesson is prefixed with
/// `Lesson N content: ` so it carries its lesson context into retrieval.
pub fn parse_course_document(
    file_name: &str,
    content: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> ParsedCourse {
    let mut title: Option<String> = None;
    let mut link: Option<String> = None;
    let mut instructor: Option<String> = None;
    let mut preamble: Vec<&str> = Vec::new();
    let mut sections: Vec<LessonSection> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();

        if let Some((number, lesson_title)) = parse_lesson_marker(trimmed) {
            sections.push(LessonSection {
                lesson: Lesson {
                    number,
                    title: lesson_title,
                    link: None,
                },
                body: Vec::new(),
                expecting_link: true,
            });
            continue;
        }

        match sections.last_mut() {
            Some(section) => {
                if section.expecting_link && !trimmed.is_empty() {
                    section.expecting_link = false;
                    if let Some(url) = header_value(trimmed, LESSON_LINK_PREFIX) {
                        section.lesson.link = Some(url);
                        continue;
                    }
                }
                section.body.push(line);
            }
            None => {
                if let Some(v) = header_value(trimmed, TITLE_PREFIX) {
                    title = Some(v);
                } else if let Some(v) = header_value(trimmed, LINK_PREFIX) {
                    link = Some(v);
                } else if let Some(v) = header_value(trimmed, INSTRUCTOR_PREFIX) {
                    instructor = Some(v);
                } else {
                    preamble.push(line);
                }
            }
        }
    }

    let title = title.unwrap_or_else(|| file_name.to_string());
    let mut lessons = Vec::new();
    let mut chunks = Vec::new();

    if sections.is_empty() {
        for text in chunk_sentences(&preamble.join("\n"), chunk_size, chunk_overlap) {
            chunks.push(ContentChunk {
                text,
                course_title: title.clone(),
                lesson_number: None,
                chunk_index: chunks.len(),
            });
        }
    } else {
        for section in sections {
            let pieces = chunk_sentences(&section.body.join("\n"), chunk_size, chunk_overlap);
            if pieces.is_empty() {
                continue;
            }
            let number = section.lesson.number;
            for (i, piece) in pieces.into_iter().enumerate() {
                let text = if i == 0 {
                    format!("Lesson {} content: {}", number, piece)
                } else {
                    piece
                };
                chunks.push(ContentChunk {
                    text,
                    course_title: title.clone(),
                    lesson_number: Some(number),
                    chunk_index: chunks.len(),
                });
            }
            lessons.push(section.lesson);
        }
    }

    ParsedCourse {
        course: Course {
            title,
            instructor,
            link,
            lessons,
        },
        chunks,
    }
}

/// `Lesson <n>: <title>`, case-insensitive on the keyword.
fn parse_lesson_marker(line: &str) -> Option<(u32, String)> {
    let keyword = line.get(..7)?;
    if !keyword.eq_ignore_ascii_case("lesson ") {
        return None;
    }
    let (number, title) = line[7..].split_once(':')?;
    let number = number.trim().parse::<u32>().ok()?;
    Some((number, title.trim().to_string()))
}

/// Value after `prefix`, or `None` if the line has another prefix or the
/// value is blank.
fn header_value(line: &str, prefix: &str) -> Option<String> {
    let value = line.strip_prefix(prefix)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
