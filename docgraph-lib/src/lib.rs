//! docgraph - hybrid vector + graph retrieval over Rust documentation
//!
//! # Architecture
//!
//! ```text
//! Scraper -> Document -> Indexer -> Embedder -> VectorStore
//!                           |                      ^   |
//!                           +----> GraphStore      |   |
//!                                      ^           |   |
//! Query -> Embedder -> HybridSearchEngine ---------+   |
//!                         |        ^-------------------+
//!                      Results
//! ```
//!
//! Every indexed document becomes a vector record (`docId` = url) and a
//! `document` graph node (`vectorId` = the record's id). Documents sharing a
//! module hang off one `module` node through `contains` edges.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docgraph_lib::{
//!     embed::BgeEmbedder, graph::MemoryGraphStore, index::Indexer,
//!     search::HybridSearchEngine, store::MemoryVectorStore,
//! };
//!
//! let embedder = Arc::new(BgeEmbedder::new()?);
//! let vectors = Arc::new(MemoryVectorStore::new());
//! let graph = Arc::new(MemoryGraphStore::new());
//!
//! // Index a document
//! let indexer = Indexer::new(embedder.clone(), vectors.clone(), graph.clone());
//! indexer.index_document(&document).await?;
//!
//! // Search
//! let engine = HybridSearchEngine::new(embedder, vectors, graph);
//! let results = engine.search("What is an Option?", 5).await?;
//! ```

pub mod config;
pub mod document;
pub mod embed;
pub mod error;
pub mod graph;
pub mod index;
pub mod scrape;
pub mod search;
pub mod store;

mod snapshot;
#[cfg(test)]
mod testing;

pub use document::{DocMetadata, DocType, Document};
pub use error::{Error, Result};
