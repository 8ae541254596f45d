//! Per-query citation collection.

use std::sync::{Mutex, PoisonError};

use coursemate_core::models::Citation;

/// Citations recorded by tool executions during one query.
///
/// A tracker belongs to exactly one query: the assistant creates a fresh
/// one for every call and drains it once the final answer is ready, so
/// concurrent queries never see each other's citations.
#[derive(Debug, Default)]
pub struct SourceTracker {
    citations: Mutex<Vec<Citation>>,
}

impl SourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a citation. Order is preserved and duplicates are kept.
    pub fn record(&self, citation: Citation) {
        self.citations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(citation);
    }

    /// Take every recorded citation, leaving the tracker empty.
    pub fn drain(&self) -> Vec<Citation> {
        std::mem::take(&mut *self.citations.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.citations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
