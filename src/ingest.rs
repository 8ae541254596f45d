//! Course folder ingestion.
//!
//! Scans `[docs].root` for files matching the include globs, parses each
//! into a course, and stores courses whose title is not already in the
//! catalog. Files are processed in sorted path order so repeated runs see
//! the same order.

use anyhow::{bail, Result};
use coursemate_core::document::parse_course_document;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::{ChunkingConfig, DocsConfig};
use crate::store::CourseStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub courses_added: usize,
    pub chunks_added: usize,
    /// Files whose course title was already in the catalog.
    pub skipped: usize,
}

pub async fn ingest_folder(
    store: &CourseStore,
    docs: &DocsConfig,
    chunking: &ChunkingConfig,
) -> Result<IngestSummary> {
    let files = scan_course_files(docs)?;
    let mut existing: HashSet<String> = store.course_titles().await?.into_iter().collect();
    let mut summary = IngestSummary::default();

    for path in files {
        let bytes = std::fs::read(&path)?;
        let content = String::from_utf8_lossy(&bytes);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let parsed = parse_course_document(
            &file_name,
            &content,
            chunking.chunk_size,
            chunking.chunk_overlap,
        );

        if existing.contains(&parsed.course.title) {
            info!(course = %parsed.course.title, "course already loaded, skipping");
            summary.skipped += 1;
            continue;
        }
        if parsed.chunks.is_empty() {
            warn!(file = %path.display(), "no content found in course file");
        }

        store.add_course(&parsed).await?;
        info!(
            course = %parsed.course.title,
            lessons = parsed.course.lessons.len(),
            chunks = parsed.chunks.len(),
            "added course"
        );
        summary.courses_added += 1;
        summary.chunks_added += parsed.chunks.len();
        existing.insert(parsed.course.title);
    }

    Ok(summary)
}

/// Course files under `docs.root` matching the include globs, sorted.
pub fn scan_course_files(docs: &DocsConfig) -> Result<Vec<PathBuf>> {
    let root = &docs.root;
    if !root.exists() {
        bail!("Docs root does not exist: {}", root.display());
    }

    let include_set = build_globset(&docs.include_globs)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if include_set.is_match(relative(path, root)) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
