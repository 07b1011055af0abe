//! Vector storage backends
//!
//! The production vector index is an external service; this module defines
//! the narrow contract the indexer and the search engine rely on, plus an
//! in-memory implementation for development and testing.
//!
//! # Storage Model
//!
//! Each stored item is a [`VectorRecord`]:
//! - id: assigned by the store on insert
//! - embedding: the vector representation
//! - metadata: always carries `docId`, the url of the source document
//!
//! # Usage
//!
//! ```ignore
//! use docgraph_lib::store::{MemoryVectorStore, VectorStore};
//!
//! let store = MemoryVectorStore::new();
//!
//! let record = store.insert(embedding, metadata).await?;
//!
//! // Search by vector similarity
//! let matches = store.search(&query_embedding, 5).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{keys, str_prop, Properties};
use crate::embed::Embedding;
use crate::Result;

/// A stored embedding and its metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    /// Store-assigned identifier
    pub id: String,
    pub embedding: Embedding,
    pub metadata: Properties,
}

impl VectorRecord {
    /// Url of the document this vector was computed from.
    #[must_use]
    pub fn doc_id(&self) -> Option<&str> {
        str_prop(&self.metadata, keys::DOC_ID)
    }
}

/// A search hit with similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    /// The matched record
    pub record: VectorRecord,
    /// Similarity score (higher is more similar)
    /// For cosine similarity: -1.0 to 1.0
    pub score: f32,
}

/// Trait for vector storage backends
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store an embedding, returning the record with its assigned id
    async fn insert(&self, embedding: Embedding, metadata: Properties) -> Result<VectorRecord>;

    /// Search for similar vectors
    ///
    /// # Arguments
    /// * `query_embedding` - The query vector
    /// * `limit` - Maximum number of results to return
    ///
    /// # Returns
    /// At most `limit` matches sorted by similarity (highest first). Every match
    /// carries its score.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<VectorMatch>>;

    /// Fetch a record by id, failing with `NotFound` if absent
    async fn get(&self, id: &str) -> Result<VectorRecord>;

    /// Remove a record by id, failing with `NotFound` if absent
    async fn delete(&self, id: &str) -> Result<()>;

    /// Every stored record
    async fn records(&self) -> Result<Vec<VectorRecord>>;

    /// Get total number of stored vectors
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

mod memory;

pub use memory::*;
