//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::document::{keys, DocMetadata, DocType, Document, Properties};
use crate::embed::{Embedding, EmbeddingProvider};
use crate::store::{VectorMatch, VectorRecord, VectorStore};
use crate::{Error, Result};

/// Embedder with a fixed text -> vector table.
///
/// Unknown texts get `fallback`. Texts listed in `failing` produce a provider
/// error.
pub struct StubEmbedder {
    table: HashMap<String, Embedding>,
    fallback: Embedding,
    failing: Vec<String>,
}

impl StubEmbedder {
    pub fn new(fallback: Embedding) -> Self {
        Self {
            table: HashMap::new(),
            fallback,
            failing: Vec::new(),
        }
    }

    pub fn with(mut self, text: &str, embedding: Embedding) -> Self {
        self.table.insert(text.to_string(), embedding);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if self.failing.iter().any(|t| t == text) {
            return Err(Error::Provider(format!("stub refuses to embed '{text}'")));
        }
        Ok(self.table.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
    }

    fn dimension(&self) -> usize {
        self.fallback.len()
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Vector store whose search always returns a scripted list of matches,
/// regardless of the query.
pub struct ScriptedVectorStore {
    matches: Mutex<Vec<VectorMatch>>,
}

impl ScriptedVectorStore {
    pub fn new(matches: Vec<VectorMatch>) -> Self {
        Self {
            matches: Mutex::new(matches),
        }
    }
}

#[async_trait]
impl VectorStore for ScriptedVectorStore {
    async fn insert(&self, _embedding: Embedding, _metadata: Properties) -> Result<VectorRecord> {
        Err(Error::Store("scripted store is read-only".to_string()))
    }

    async fn search(&self, _query: &[f32], limit: usize) -> Result<Vec<VectorMatch>> {
        let matches = self.matches.lock().unwrap();
        Ok(matches.iter().take(limit).cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<VectorRecord> {
        self.matches
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.record.id == id)
            .map(|m| m.record.clone())
            .ok_or_else(|| Error::NotFound(format!("vector {id}")))
    }

    async fn delete(&self, _id: &str) -> Result<()> {
        Err(Error::Store("scripted store is read-only".to_string()))
    }

    async fn records(&self) -> Result<Vec<VectorRecord>> {
        Ok(self.matches.lock().unwrap().iter().map(|m| m.record.clone()).collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.matches.lock().unwrap().len())
    }
}

/// Match for a record pointing at `doc_id`.
pub fn scripted_match(id: &str, doc_id: &str, score: f32) -> VectorMatch {
    let mut metadata = Properties::new();
    metadata.insert(keys::DOC_ID.to_string(), Value::String(doc_id.to_string()));
    VectorMatch {
        record: VectorRecord {
            id: id.to_string(),
            embedding: vec![1.0, 0.0],
            metadata,
        },
        score,
    }
}

pub fn doc(title: &str, content: &str, url: &str, module: Option<&str>) -> Document {
    Document {
        title: title.to_string(),
        content: content.to_string(),
        url: url.to_string(),
        doc_type: DocType::Std,
        metadata: DocMetadata {
            module: module.map(String::from),
            ..Default::default()
        },
    }
}
