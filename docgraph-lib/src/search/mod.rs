//! Hybrid search
//!
//! Combines vector similarity with the document graph.
//!
//! # Usage
//!
//! ```ignore
//! use docgraph_lib::search::HybridSearchEngine;
//!
//! let engine = HybridSearchEngine::new(embedder, vectors, graph);
//!
//! // Nearest documents to a free-text query
//! let results = engine.search("how do I handle a missing value?", 5).await?;
//!
//! // Graph neighbours of a node plus its nearest documents in vector space
//! let related = engine.related_documents(&results[0].node.id, None).await?;
//! ```

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::document::keys;
use crate::embed::EmbeddingProvider;
use crate::graph::{GraphNode, GraphStore, DOCUMENT_LABEL};
use crate::store::{VectorRecord, VectorStore};
use crate::Result;

/// A ranked search hit
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HybridSearchResult {
    /// The document node the hit resolved to
    pub node: GraphNode,
    /// The vector that matched the query
    pub vector: Option<VectorRecord>,
    /// Similarity score (higher is more relevant)
    pub score: f32,
}

/// Per-query knobs
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Results scoring below this are dropped
    pub min_score: Option<f32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            min_score: None,
        }
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            limit: config.limit,
            min_score: config.min_score,
        }
    }
}

/// Search engine over an embedding provider, a vector store and a graph store.
pub struct HybridSearchEngine<E: ?Sized, V: ?Sized, G: ?Sized> {
    embedder: Arc<E>,
    vectors: Arc<V>,
    graph: Arc<G>,
    related_limit: usize,
}

impl<E, V, G> HybridSearchEngine<E, V, G>
where
    E: EmbeddingProvider + ?Sized,
    V: VectorStore + ?Sized,
    G: GraphStore + ?Sized,
{
    /// Create an engine fetching 5 similar documents per related-document lookup.
    #[must_use]
    pub fn new(embedder: Arc<E>, vectors: Arc<V>, graph: Arc<G>) -> Self {
        Self {
            embedder,
            vectors,
            graph,
            related_limit: SearchConfig::default().related_limit,
        }
    }

    /// Set how many similar vectors [`related_documents`](Self::related_documents)
    /// considers.
    #[must_use]
    pub fn with_related_limit(mut self, related_limit: usize) -> Self {
        self.related_limit = related_limit;
        self
    }

    /// Search for documents matching `query`, returning at most `limit` results.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<HybridSearchResult>> {
        self.search_with(
            query,
            &SearchOptions {
                limit,
                min_score: None,
            },
        )
        .await
    }

    /// Search with explicit [`SearchOptions`].
    ///
    /// Vector candidates whose document node cannot be resolved are skipped.
    /// Results are sorted by score, highest first; equal scores keep the order
    /// the vector store returned them in. A document matched by several of its
    /// vectors (after a re-index) is reported once, with its best-scoring
    /// vector and the node that vector was indexed with.
    pub async fn search_with(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<HybridSearchResult>> {
        let query_embedding = self.embedder.embed_query(query).await?;
        let candidates = self.vectors.search(&query_embedding, options.limit).await?;

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if options.min_score.is_some_and(|min| candidate.score < min) {
                continue;
            }

            let Some(node) = self.resolve_document(&candidate.record).await? else {
                debug!(
                    "Dropping vector {} with no document node for {:?}",
                    candidate.record.id,
                    candidate.record.doc_id()
                );
                continue;
            };

            if !seen.insert(document_key(&node)) {
                continue;
            }

            results.push(HybridSearchResult {
                node,
                score: candidate.score,
                vector: Some(candidate.record),
            });
        }

        // stable, so ties keep store order
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(options.limit);
        Ok(results)
    }

    /// Documents related to the node `document_id`.
    ///
    /// Two hops are combined: the node's direct graph neighbours (its module),
    /// restricted to edges labeled `edge_label` when one is given, then the
    /// document nodes of the nearest vectors to the node's own vector. Each
    /// document appears once and the document itself is never included. A
    /// node without a usable `vectorId` only gets its graph neighbours.
    pub async fn related_documents(
        &self,
        document_id: &str,
        edge_label: Option<&str>,
    ) -> Result<Vec<GraphNode>> {
        let node = self.graph.get_node(document_id).await?;
        let mut related = self.graph.get_connected_nodes(document_id, edge_label).await?;

        let mut seen: HashSet<String> = related.iter().map(document_key).collect();
        seen.insert(document_key(&node));

        let Some(vector_id) = node.vector_id() else {
            return Ok(related);
        };

        let vector = match self.vectors.get(vector_id).await {
            Ok(vector) => vector,
            Err(e) if e.is_not_found() => {
                warn!("Node {document_id} has dangling vector {vector_id}, skipping similarity");
                return Ok(related);
            }
            Err(e) => return Err(e),
        };

        for similar in self.vectors.search(&vector.embedding, self.related_limit).await? {
            if let Some(node) = self.resolve_document(&similar.record).await? {
                if seen.insert(document_key(&node)) {
                    related.push(node);
                }
            }
        }

        Ok(related)
    }

    /// The document node a vector was indexed for.
    ///
    /// The node carrying the vector's id wins. Only when there is none does
    /// the `docId` url decide, picking the newest node for that url.
    async fn resolve_document(&self, record: &VectorRecord) -> Result<Option<GraphNode>> {
        if let Some(node) = self
            .graph
            .find_node(DOCUMENT_LABEL, keys::VECTOR_ID, &record.id)
            .await?
        {
            return Ok(Some(node));
        }
        let Some(doc_id) = record.doc_id() else {
            return Ok(None);
        };
        self.graph.find_node(DOCUMENT_LABEL, keys::URL, doc_id).await
    }

    /// Returns a reference to the vector store.
    #[must_use]
    pub fn vectors(&self) -> &V {
        &self.vectors
    }

    /// Returns a reference to the graph store.
    #[must_use]
    pub fn graph(&self) -> &G {
        &self.graph
    }
}

/// Identity of a document across re-indexes: its url, else its node id.
fn document_key(node: &GraphNode) -> String {
    node.prop(keys::URL).unwrap_or(node.id.as_str()).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::document::Properties;
    use crate::graph::MemoryGraphStore;
    use crate::index::Indexer;
    use crate::store::MemoryVectorStore;
    use crate::testing::{doc, scripted_match, ScriptedVectorStore, StubEmbedder};

    type MemoryEngine = HybridSearchEngine<StubEmbedder, MemoryVectorStore, MemoryGraphStore>;

    /// Indexes documents whose content embeds to the given vector.
    async fn memory_engine(
        docs: &[(&str, &str, Option<&str>, Vec<f32>)],
        query: Vec<f32>,
    ) -> MemoryEngine {
        let mut embedder = StubEmbedder::new(vec![0.0, 0.0, 0.0]).with("query", query);
        for (title, _, _, embedding) in docs {
            embedder = embedder.with(title, embedding.clone());
        }
        let embedder = Arc::new(embedder);
        let vectors = Arc::new(MemoryVectorStore::new());
        let graph = Arc::new(MemoryGraphStore::new());

        let indexer = Indexer::new(Arc::clone(&embedder), Arc::clone(&vectors), Arc::clone(&graph));
        for (title, url, module, _) in docs {
            // content == title so the stub table is keyed by title
            indexer.index_document(&doc(title, title, url, *module)).await.unwrap();
        }

        HybridSearchEngine::new(embedder, vectors, graph)
    }

    async fn document_node(graph: &MemoryGraphStore, url: &str) -> GraphNode {
        graph.find_node(DOCUMENT_LABEL, keys::URL, url).await.unwrap().unwrap()
    }

    fn urls(results: &[HybridSearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.node.prop(keys::URL).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_results() {
        let engine = memory_engine(&[], vec![1.0, 0.0, 0.0]).await;
        let results = engine.search("nonexistent topic", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_sorted_and_limited() {
        let engine = memory_engine(
            &[
                ("far", "std/far", None, vec![0.0, 1.0, 0.0]),
                ("close", "std/close", None, vec![1.0, 0.0, 0.0]),
                ("medium", "std/medium", None, vec![0.5, 0.5, 0.0]),
            ],
            vec![1.0, 0.0, 0.0],
        )
        .await;

        let results = engine.search("query", 2).await.unwrap();

        assert_eq!(urls(&results), vec!["std/close", "std/medium"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|r| r.vector.is_some()));
    }

    #[tokio::test]
    async fn test_higher_score_first_regardless_of_store_order() {
        let graph = Arc::new(MemoryGraphStore::new());
        for url in ["std/low", "std/high"] {
            let mut props = Properties::new();
            props.insert(keys::URL.to_string(), Value::String(url.to_string()));
            graph.create_node(DOCUMENT_LABEL, props).await.unwrap();
        }
        let vectors = Arc::new(ScriptedVectorStore::new(vec![
            scripted_match("v-low", "std/low", 0.4),
            scripted_match("v-high", "std/high", 0.9),
        ]));
        let embedder = Arc::new(StubEmbedder::new(vec![1.0, 0.0]));
        let engine = HybridSearchEngine::new(embedder, vectors, graph);

        let results = engine.search("anything", 5).await.unwrap();

        assert_eq!(urls(&results), vec!["std/high", "std/low"]);
        assert!((results[0].score - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_store_order() {
        let graph = Arc::new(MemoryGraphStore::new());
        for url in ["std/b", "std/a", "std/c"] {
            let mut props = Properties::new();
            props.insert(keys::URL.to_string(), Value::String(url.to_string()));
            graph.create_node(DOCUMENT_LABEL, props).await.unwrap();
        }
        let vectors = Arc::new(ScriptedVectorStore::new(vec![
            scripted_match("1", "std/b", 0.5),
            scripted_match("2", "std/a", 0.5),
            scripted_match("3", "std/c", 0.7),
        ]));
        let embedder = Arc::new(StubEmbedder::new(vec![1.0, 0.0]));
        let engine = HybridSearchEngine::new(embedder, vectors, graph);

        let results = engine.search("anything", 5).await.unwrap();

        assert_eq!(urls(&results), vec!["std/c", "std/b", "std/a"]);
    }

    #[tokio::test]
    async fn test_unresolvable_candidates_are_dropped() {
        let graph = Arc::new(MemoryGraphStore::new());
        let mut props = Properties::new();
        props.insert(keys::URL.to_string(), Value::String("std/known".to_string()));
        graph.create_node(DOCUMENT_LABEL, props).await.unwrap();

        let mut no_doc_id = scripted_match("v-bare", "unused", 0.95);
        no_doc_id.record.metadata.clear();
        let vectors = Arc::new(ScriptedVectorStore::new(vec![
            no_doc_id,
            scripted_match("v-ghost", "std/ghost", 0.9),
            scripted_match("v-known", "std/known", 0.2),
        ]));
        let embedder = Arc::new(StubEmbedder::new(vec![1.0, 0.0]));
        let engine = HybridSearchEngine::new(embedder, vectors, graph);

        let results = engine.search("anything", 5).await.unwrap();

        assert_eq!(urls(&results), vec!["std/known"]);
    }

    #[tokio::test]
    async fn test_min_score_cuts_off() {
        let engine = memory_engine(
            &[
                ("close", "std/close", None, vec![1.0, 0.0, 0.0]),
                ("far", "std/far", None, vec![0.0, 1.0, 0.0]),
            ],
            vec![1.0, 0.0, 0.0],
        )
        .await;

        let options = SearchOptions {
            limit: 5,
            min_score: Some(0.5),
        };
        let results = engine.search_with("query", &options).await.unwrap();

        assert_eq!(urls(&results), vec!["std/close"]);
    }

    #[tokio::test]
    async fn test_reindexed_document_reported_once() {
        let engine = memory_engine(
            &[
                ("vec", "std/vec", None, vec![1.0, 0.0, 0.0]),
                ("vec", "std/vec", None, vec![1.0, 0.0, 0.0]),
            ],
            vec![1.0, 0.0, 0.0],
        )
        .await;

        let results = engine.search("query", 5).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_reindexed_result_pairs_node_with_its_vector() {
        let engine = memory_engine(
            &[
                ("vec", "std/vec", None, vec![1.0, 0.0, 0.0]),
                ("vec", "std/vec", None, vec![1.0, 0.0, 0.0]),
            ],
            vec![1.0, 0.0, 0.0],
        )
        .await;

        let results = engine.search("query", 5).await.unwrap();

        let result = &results[0];
        let vector = result.vector.as_ref().unwrap();
        assert_eq!(result.node.vector_id(), Some(vector.id.as_str()));
        assert_eq!(vector.doc_id(), result.node.prop(keys::URL));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let engine = HybridSearchEngine::new(
            Arc::new(StubEmbedder::new(vec![1.0]).failing_on("query")),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(MemoryGraphStore::new()),
        );
        let err = engine.search("query", 5).await.unwrap_err();
        assert!(matches!(err, crate::Error::Provider(_)));
    }

    #[tokio::test]
    async fn test_related_combines_graph_and_similarity() {
        let engine = memory_engine(
            &[
                ("option", "std/option", Some("std"), vec![1.0, 0.0, 0.0]),
                ("result", "std/result", Some("std"), vec![0.9, 0.1, 0.0]),
                ("maybe", "crate/maybe", None, vec![0.95, 0.05, 0.0]),
                ("net", "std/net", Some("net"), vec![0.0, 0.0, 1.0]),
            ],
            vec![1.0, 0.0, 0.0],
        )
        .await
        .with_related_limit(3);

        let option = document_node(engine.graph(), "std/option").await;
        let related = engine.related_documents(&option.id, None).await.unwrap();

        // module node first, then nearest neighbours, never the document itself
        assert_eq!(related[0].label, "module");
        assert_eq!(related[0].prop(keys::NAME), Some("std"));
        let related_urls: Vec<_> = related[1..].iter().filter_map(|n| n.prop(keys::URL)).collect();
        assert_eq!(related_urls, vec!["crate/maybe", "std/result"]);
        assert!(related.iter().all(|n| n.id != option.id));
    }

    #[tokio::test]
    async fn test_related_has_no_duplicates() {
        let engine = memory_engine(
            &[
                ("a", "std/a", Some("std"), vec![1.0, 0.0, 0.0]),
                ("b", "std/b", Some("std"), vec![1.0, 0.0, 0.0]),
            ],
            vec![1.0, 0.0, 0.0],
        )
        .await;

        // b is reachable from a by an explicit edge and as its nearest neighbour
        let a = document_node(engine.graph(), "std/a").await;
        let b = document_node(engine.graph(), "std/b").await;
        engine
            .graph()
            .create_edge(&a.id, &b.id, "mentions", Properties::new())
            .await
            .unwrap();

        let related = engine.related_documents(&a.id, None).await.unwrap();

        let mut ids: Vec<_> = related.iter().map(|n| n.id.clone()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 2);
        assert!(related.iter().any(|n| n.id == b.id));
    }

    #[tokio::test]
    async fn test_related_filters_graph_hop_by_edge_label() {
        let engine = memory_engine(
            &[
                ("a", "std/a", Some("std"), vec![1.0, 0.0, 0.0]),
                ("b", "std/b", None, vec![0.0, 1.0, 0.0]),
            ],
            vec![1.0, 0.0, 0.0],
        )
        .await
        .with_related_limit(1);

        let a = document_node(engine.graph(), "std/a").await;
        let b = document_node(engine.graph(), "std/b").await;
        engine
            .graph()
            .create_edge(&a.id, &b.id, "mentions", Properties::new())
            .await
            .unwrap();

        let mentions = engine.related_documents(&a.id, Some("mentions")).await.unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].id, b.id);

        let contains = engine.related_documents(&a.id, Some("contains")).await.unwrap();
        assert_eq!(contains.len(), 1);
        assert_eq!(contains[0].label, "module");
    }

    #[tokio::test]
    async fn test_related_without_vector_id_uses_graph_only() {
        let graph = Arc::new(MemoryGraphStore::new());
        let lonely = graph.create_node(DOCUMENT_LABEL, Properties::new()).await.unwrap();
        let vectors = Arc::new(MemoryVectorStore::new());
        vectors.insert(vec![1.0, 0.0], Properties::new()).await.unwrap();

        let embedder = Arc::new(StubEmbedder::new(vec![1.0, 0.0]));
        let engine = HybridSearchEngine::new(embedder, vectors, graph);
        let related = engine.related_documents(&lonely.id, None).await.unwrap();

        assert!(related.is_empty());
    }

    #[tokio::test]
    async fn test_related_with_dangling_vector_id_uses_graph_only() {
        let engine = memory_engine(
            &[("option", "std/option", Some("std"), vec![1.0, 0.0, 0.0])],
            vec![1.0, 0.0, 0.0],
        )
        .await;
        let option = document_node(engine.graph(), "std/option").await;
        engine.vectors().delete(option.vector_id().unwrap()).await.unwrap();

        let related = engine.related_documents(&option.id, None).await.unwrap();

        assert_eq!(related.len(), 1);
        assert_eq!(related[0].label, "module");
    }

    #[tokio::test]
    async fn test_related_unknown_node_is_not_found() {
        let engine = memory_engine(&[], vec![1.0, 0.0, 0.0]).await;
        let err = engine.related_documents("missing", None).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
