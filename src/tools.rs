//! Built-in retrieval tools.
//!
//! - [`SearchContentTool`] (`search_course_content`): semantic search over
//!   lesson content, optionally narrowed to a course and lesson.
//! - [`CourseOutlineTool`] (`get_course_outline`): a course's title, link,
//!   and full lesson list.
//!
//! Both resolve partial course names through the [`CourseStore`](crate::store::CourseStore) and report
//! a missing course as plain text for the model rather than as an error.
//! Store failures come back as [`ToolError::Transport`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use coursemate_core::models::{Citation, Course, SearchMatch};
use serde_json::{json, Value};

use crate::store::SearchResults;
use crate::traits::{Tool, ToolContext, ToolError};

pub struct SearchContentTool;

#[async_trait]
impl Tool for SearchContentTool {
    fn name(&self) -> &str {
        "search_course_content"
    }

    fn description(&self) -> &str {
        "Search course materials with smart course name matching and lesson filtering"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for in the course content"
                },
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                },
                "lesson_number": {
                    "type": "integer",
                    "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let query = args["query"].as_str().unwrap_or("");
        if query.trim().is_empty() {
            bail!("query must not be empty");
        }
        let course_name = args.get("course_name").and_then(Value::as_str);
        let lesson_number = match args.get("lesson_number") {
            Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(n) => Some(n),
                None => bail!("lesson_number must be a non-negative integer"),
            },
            None => None,
        };

        let results = ctx
            .store
            .search_content(query, course_name, lesson_number)
            .await
            .map_err(|e| ToolError::transport(self.name(), e))?;
        let matches = match results {
            SearchResults::CourseNotFound { query } => {
                return Ok(format!("No course found matching '{}'", query));
            }
            SearchResults::Found(matches) => matches,
        };

        if matches.is_empty() {
            let mut message = "No relevant content found".to_string();
            if let Some(name) = course_name {
                message.push_str(&format!(" in course '{}'", name));
            }
            if let Some(n) = lesson_number {
                message.push_str(&format!(" in lesson {}", n));
            }
            message.push('.');
            return Ok(message);
        }

        let mut blocks = Vec::with_capacity(matches.len());
        for m in &matches {
            let label = match_label(m);
            let link = match m.lesson_number {
                Some(n) => ctx
                    .store
                    .get_lesson_link(&m.course_title, n)
                    .await
                    .map_err(|e| ToolError::transport(self.name(), e))?,
                None => None,
            };
            ctx.sources.record(Citation::new(label.clone(), link));
            blocks.push(format!("[{}]\n{}", label, m.text));
        }

        Ok(blocks.join("\n\n"))
    }
}

/// `Course` or `Course - Lesson N`.
fn match_label(m: &SearchMatch) -> String {
    match m.lesson_number {
        Some(n) => format!("{} - Lesson {}", m.course_title, n),
        None => m.course_title.clone(),
    }
}

pub struct CourseOutlineTool;

#[async_trait]
impl Tool for CourseOutlineTool {
    fn name(&self) -> &str {
        "get_course_outline"
    }

    fn description(&self) -> &str {
        "Get complete course outline including course title, course link, and all lessons with their titles and links"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "course_title": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                }
            },
            "required": ["course_title"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let course_title = args["course_title"].as_str().unwrap_or("");
        if course_title.trim().is_empty() {
            bail!("course_title must not be empty");
        }

        let outline = ctx
            .store
            .get_course_outline(course_title)
            .await
            .map_err(|e| ToolError::transport(self.name(), e))?;

        match outline {
            Some(course) => {
                ctx.sources
                    .record(Citation::new(course.title.clone(), course.link.clone()));
                Ok(format_outline(&course))
            }
            None => Ok(format!("No course found matching '{}'", course_title)),
        }
    }
}

/// Render an outline. Lessons are expected in ascending number order.
pub fn format_outline(course: &Course) -> String {
    let mut lines = vec![
        format!("**{}**", course.title),
        format!(
            "Course Link: {}",
            course.link.as_deref().unwrap_or("No link available")
        ),
    ];
    if let Some(instructor) = &course.instructor {
        lines.push(format!("Instructor: {}", instructor));
    }
    lines.push(String::new());

    if course.lessons.is_empty() {
        lines.push("No lessons found for this course.".to_string());
    } else {
        lines.push("**Course Lessons:**".to_string());
        for lesson in &course.lessons {
            let mut line = format!("Lesson {}: {}", lesson.number, lesson.title);
            if let Some(link) = &lesson.link {
                line.push_str(&format!(" - [Link]({})", link));
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}
