//! In-memory [`VectorIndex`] implementation.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Query is brute-force cosine distance over every record in the
//! collection that passes the filter. Nothing is persisted: the index
//! lives as long as the process.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::{cosine_distance, Embedder};

use super::{IndexHit, IndexRecord, MetadataFilter, VectorIndex};

struct StoredRecord {
    record: IndexRecord,
    vector: Vec<f32>,
}

/// In-memory index over an [`Embedder`].
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    collections: RwLock<HashMap<String, Vec<StoredRecord>>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Name of the embedding model backing this index.
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // Embed before taking the lock; the guard must not live across an await.
        let texts: Vec<String> = records.iter().map(|r| r.document.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != records.len() {
            bail!(
                "embedder returned {} vectors for {} records",
                vectors.len(),
                records.len()
            );
        }

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = collections.entry(collection.to_string()).or_default();
        for (record, vector) in records.iter().zip(vectors) {
            match stored.iter_mut().find(|s| s.record.id == record.id) {
                Some(existing) => {
                    existing.record = record.clone();
                    existing.vector = vector;
                }
                None => stored.push(StoredRecord {
                    record: record.clone(),
                    vector,
                }),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))?;

        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = match collections.get(collection) {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };

        let mut hits: Vec<IndexHit> = stored
            .iter()
            .filter(|s| filter.map_or(true, |f| f.matches(&s.record.metadata)))
            .map(|s| IndexHit {
                id: s.record.id.clone(),
                document: s.record.document.clone(),
                metadata: s.record.metadata.clone(),
                distance: cosine_distance(&query_vec, &s.vector),
            })
            .collect();

        // Stable sort: equal distances keep insertion order.
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<IndexRecord>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .and_then(|stored| stored.iter().find(|s| s.record.id == id))
            .map(|s| s.record.clone()))
    }

    async fn ids(&self, collection: &str) -> Result<Vec<String>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .map(|stored| stored.iter().map(|s| s.record.id.clone()).collect())
            .unwrap_or_default())
    }
}
