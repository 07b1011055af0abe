//! Graph storage backends
//!
//! Like the vector index, the graph database is an external capability. The
//! [`GraphStore`] trait is the contract the rest of the crate is written
//! against; [`MemoryGraphStore`] implements it in-process.
//!
//! # Graph Model
//!
//! ```text
//! (module {name}) --contains--> (document {title, url, type, vectorId, ...})
//! ```
//!
//! Module nodes are keyed by `name` and created through
//! [`GraphStore::create_or_get_node`], so concurrent indexers never produce a
//! second node for the same module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{keys, str_prop, Properties};
use crate::Result;

/// Label of per-document nodes
pub const DOCUMENT_LABEL: &str = "document";
/// Label of per-module grouping nodes
pub const MODULE_LABEL: &str = "module";
/// Edge label from a module to the documents it contains
pub const CONTAINS_EDGE: &str = "contains";

/// A labeled node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    /// Store-assigned identifier
    pub id: String,
    pub label: String,
    pub properties: Properties,
}

impl GraphNode {
    /// Id of the vector record linked to a document node.
    #[must_use]
    pub fn vector_id(&self) -> Option<&str> {
        str_prop(&self.properties, keys::VECTOR_ID)
    }

    #[must_use]
    pub fn is_document(&self) -> bool {
        self.label == DOCUMENT_LABEL
    }

    /// String-valued property.
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<&str> {
        str_prop(&self.properties, key)
    }
}

/// A directed, labeled edge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
}

/// Trait for graph storage backends
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create a node, returning it with its assigned id
    async fn create_node(&self, label: &str, properties: Properties) -> Result<GraphNode>;

    /// Return the node with `label` whose `properties[key]` matches, creating
    /// it from `properties` if there is none
    ///
    /// Must be atomic: two concurrent calls with the same label and key value
    /// yield the same node. Fails with `InvalidInput` if `properties[key]` is
    /// not a string.
    async fn create_or_get_node(
        &self,
        label: &str,
        key: &str,
        properties: Properties,
    ) -> Result<GraphNode>;

    /// Create a directed edge, failing with `NotFound` if either end is absent
    async fn create_edge(
        &self,
        source: &str,
        target: &str,
        label: &str,
        properties: Properties,
    ) -> Result<GraphEdge>;

    /// Fetch a node by id, failing with `NotFound` if absent
    async fn get_node(&self, id: &str) -> Result<GraphNode>;

    /// Nodes adjacent to `id` through incoming or outgoing edges
    ///
    /// Only edges labeled `edge_label` are followed when one is given. Each
    /// neighbour appears once. Unknown ids and nodes without matching edges
    /// yield an empty list.
    async fn get_connected_nodes(&self, id: &str, edge_label: Option<&str>)
        -> Result<Vec<GraphNode>>;

    /// Keyed lookup: the node with `label` whose `properties[key] == value`
    async fn find_node(&self, label: &str, key: &str, value: &str) -> Result<Option<GraphNode>>;

    /// Every node carrying `label`
    async fn nodes_with_label(&self, label: &str) -> Result<Vec<GraphNode>>;

    /// Remove a node and its incident edges, failing with `NotFound` if absent
    async fn delete_node(&self, id: &str) -> Result<()>;
}

mod memory;

pub use memory::*;
