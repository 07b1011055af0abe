use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::Properties;
use crate::embed::Embedding;
use crate::snapshot;
use crate::store::{VectorMatch, VectorRecord, VectorStore};
use crate::{Error, Result};

/// In-memory vector store for development and testing.
///
/// Uses brute-force cosine similarity search. Suitable for small datasets
/// (< 10k vectors). For production, use a proper vector database.
///
/// Matches with equal scores come back in insertion order.
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, VectorRecord>,
    order: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    records: Vec<VectorRecord>,
}

impl MemoryVectorStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Load a store previously written with [`save`](Self::save).
    ///
    /// Fails with `NotFound` if there is no snapshot at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot: Snapshot = snapshot::read_json(path.as_ref()).await?;

        let mut inner = Inner::default();
        for record in snapshot.records {
            inner.order.push(record.id.clone());
            inner.records.insert(record.id.clone(), record);
        }

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Write every record to a JSON snapshot at `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let inner = self.inner.read().await;
        let snapshot = Snapshot {
            records: inner.ordered().cloned().collect(),
        };
        snapshot::write_json(path.as_ref(), &snapshot).await
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn ordered(&self) -> impl Iterator<Item = &VectorRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert(&self, embedding: Embedding, metadata: Properties) -> Result<VectorRecord> {
        let record = VectorRecord {
            id: Uuid::new_v4().to_string(),
            embedding,
            metadata,
        };

        let mut inner = self.inner.write().await;
        inner.order.push(record.id.clone());
        inner.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<VectorMatch>> {
        let inner = self.inner.read().await;

        let mut results: Vec<VectorMatch> = inner
            .ordered()
            .map(|record| VectorMatch {
                score: cosine_similarity(query, &record.embedding),
                record: record.clone(),
            })
            .collect();

        // stable, so equal scores keep insertion order
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    async fn get(&self, id: &str) -> Result<VectorRecord> {
        self.inner
            .read()
            .await
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("vector {id}")))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.records.remove(id).is_none() {
            return Err(Error::NotFound(format!("vector {id}")));
        }
        inner.order.retain(|existing| existing != id);
        Ok(())
    }

    async fn records(&self) -> Result<Vec<VectorRecord>> {
        Ok(self.inner.read().await.ordered().cloned().collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.records.len())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction. Vectors of
/// different lengths (embeddings from another model) score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
