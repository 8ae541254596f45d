//! Vector index abstraction for coursemate.
//!
//! The [`VectorIndex`] trait is the contract the retrieval layer expects
//! from an embedding-backed store: named collections of records, each with
//! one embedded text field and a JSON metadata payload, queried by
//! nearest-neighbor search with an optional metadata filter.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A record to store in a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// Record id, unique within its collection. Upserting an existing id
    /// replaces the record.
    pub id: String,
    /// The text that is embedded and matched against queries.
    pub document: String,
    /// Structured payload returned with every hit.
    pub metadata: Map<String, Value>,
}

/// A ranked query result.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub document: String,
    pub metadata: Map<String, Value>,
    /// Distance from the query; lower is more similar.
    pub distance: f32,
}

/// A filter over record metadata.
///
/// Equality on a single field, or a conjunction of filters. The content
/// search builds course-only, lesson-only, or combined filters from these.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    Eq { field: String, value: Value },
    And(Vec<MetadataFilter>),
}

impl MetadataFilter {
    /// `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        MetadataFilter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Combine filters with AND, collapsing the trivial cases.
    ///
    /// Returns `None` for an empty list and the filter itself for a single
    /// element.
    pub fn all(mut filters: Vec<MetadataFilter>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(MetadataFilter::And(filters)),
        }
    }

    /// Evaluate the filter against a metadata payload.
    ///
    /// A missing field never matches. Numbers compare by value, so a filter
    /// built from `2u32` matches metadata holding `2` as `i64` or `u64`.
    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        match self {
            MetadataFilter::Eq { field, value } => metadata
                .get(field)
                .map(|v| values_equal(v, value))
                .unwrap_or(false),
            MetadataFilter::And(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Abstract embedding-backed index.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or replace records in a collection |
/// | [`query`](VectorIndex::query) | Nearest-neighbor search, ascending distance |
/// | [`get`](VectorIndex::get) | Fetch one record by id, no similarity involved |
/// | [`ids`](VectorIndex::ids) | List record ids in a collection |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records. Collections are created on first write.
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()>;

    /// Return up to `k` records ordered by ascending distance from `text`,
    /// restricted to records whose metadata satisfies `filter`.
    ///
    /// Querying an unknown or empty collection yields no hits.
    async fn query(
        &self,
        collection: &str,
        text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>>;

    /// Fetch a record by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<IndexRecord>>;

    /// All record ids in a collection, in insertion order.
    async fn ids(&self, collection: &str) -> Result<Vec<String>>;
}
