//! Indexing pipeline
//!
//! Turns [`Document`]s into cross-referenced records in both stores:
//!
//! ```text
//! Document --embed--> VectorRecord {docId: url}
//!     \                    ^
//!      \                   | vectorId
//!       '---------> GraphNode "document" <--contains-- GraphNode "module"
//! ```
//!
//! Writes are not transactional. If a step fails the document is abandoned and
//! anything already written stays behind; [`Reconciler`] cleans those up.
//! Indexing the same document twice creates a second vector and node rather
//! than updating the first.

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document::{keys, Document, Properties};
use crate::embed::EmbeddingProvider;
use crate::graph::{GraphNode, GraphStore, CONTAINS_EDGE, DOCUMENT_LABEL, MODULE_LABEL};
use crate::store::{VectorRecord, VectorStore};
use crate::{Error, Result};

mod reconcile;

pub use reconcile::*;

/// The records written for one document
#[derive(Debug, Clone, Serialize)]
pub struct IndexedDocument {
    pub node: GraphNode,
    pub vector: VectorRecord,
}

/// A document that could not be indexed
#[derive(Debug)]
pub struct IndexFailure {
    /// `None` when the failure happened before a document was produced,
    /// e.g. a source page that could not be scraped
    pub url: Option<String>,
    pub error: Error,
}

/// Outcome of a bulk indexing run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub indexed: Vec<IndexedDocument>,
    pub failures: Vec<IndexFailure>,
}

impl BatchReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes documents into a vector store and a graph store.
pub struct Indexer<E: ?Sized, V: ?Sized, G: ?Sized> {
    embedder: Arc<E>,
    vectors: Arc<V>,
    graph: Arc<G>,
}

impl<E, V, G> Indexer<E, V, G>
where
    E: EmbeddingProvider + ?Sized,
    V: VectorStore + ?Sized,
    G: GraphStore + ?Sized,
{
    #[must_use]
    pub fn new(embedder: Arc<E>, vectors: Arc<V>, graph: Arc<G>) -> Self {
        Self {
            embedder,
            vectors,
            graph,
        }
    }

    /// Index a single document.
    ///
    /// Embeds the document, stores the vector, creates the document node and,
    /// if the document names a module, links it from that module's node.
    pub async fn index_document(&self, doc: &Document) -> Result<IndexedDocument> {
        let embedding = self.embedder.embed(doc.embedding_text()).await?;

        let vector = self.vectors.insert(embedding, doc.vector_metadata()).await?;

        let node = self
            .graph
            .create_node(DOCUMENT_LABEL, doc.node_properties(&vector.id))
            .await?;

        if let Some(module) = doc.metadata.module_name() {
            let module_node = self.module_node(module).await?;
            self.graph
                .create_edge(&module_node.id, &node.id, CONTAINS_EDGE, Properties::new())
                .await?;
        }

        info!("Indexed: {} ({})", doc.title, doc.url);
        Ok(IndexedDocument { node, vector })
    }

    /// Index every document, `concurrency` at a time.
    ///
    /// Failures are logged and collected; they never stop the run.
    pub async fn index_all<I>(&self, docs: I, concurrency: usize) -> BatchReport
    where
        I: IntoIterator<Item = Document>,
    {
        self.index_stream(stream::iter(docs.into_iter().map(Ok)), concurrency)
            .await
    }

    /// Index documents as they arrive from `docs`, typically a scraper stream.
    ///
    /// Errors yielded by the stream itself are recorded as failures without a url.
    pub async fn index_stream<S>(&self, docs: S, concurrency: usize) -> BatchReport
    where
        S: Stream<Item = Result<Document>>,
    {
        let results = docs
            .map(|item| async move {
                match item {
                    Ok(doc) => self.index_document(&doc).await.map_err(|error| IndexFailure {
                        url: Some(doc.url.clone()),
                        error,
                    }),
                    Err(error) => Err(IndexFailure { url: None, error }),
                }
            })
            .buffer_unordered(concurrency.max(1));
        futures::pin_mut!(results);

        let mut report = BatchReport::default();
        while let Some(result) = results.next().await {
            match result {
                Ok(indexed) => report.indexed.push(indexed),
                Err(failure) => {
                    warn!(
                        "Failed to index {}: {}",
                        failure.url.as_deref().unwrap_or("<source>"),
                        failure.error
                    );
                    report.failures.push(failure);
                }
            }
        }

        info!(
            "Indexing finished: {} indexed, {} failed",
            report.indexed.len(),
            report.failures.len()
        );
        report
    }

    async fn module_node(&self, name: &str) -> Result<GraphNode> {
        let mut props = Properties::new();
        props.insert(keys::NAME.to_string(), Value::String(name.to_string()));

        let node = self
            .graph
            .create_or_get_node(MODULE_LABEL, keys::NAME, props)
            .await?;
        debug!("Module node for '{}': {}", name, node.id);
        Ok(node)
    }
}
