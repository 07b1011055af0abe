use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::{str_prop, Properties};
use crate::graph::{GraphEdge, GraphNode, GraphStore};
use crate::snapshot;
use crate::{Error, Result};

/// In-memory graph store for development and testing.
///
/// Lookups by property are linear scans. All writes go through a single lock,
/// which is what makes [`create_or_get_node`](GraphStore::create_or_get_node)
/// atomic.
pub struct MemoryGraphStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<String, GraphNode>,
    order: Vec<String>,
    edges: Vec<GraphEdge>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl MemoryGraphStore {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Load a graph previously written with [`save`](Self::save).
    ///
    /// Fails with `NotFound` if there is no snapshot at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot: Snapshot = snapshot::read_json(path.as_ref()).await?;

        let mut inner = Inner::default();
        for node in snapshot.nodes {
            inner.insert(node);
        }
        inner.edges = snapshot.edges;

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Write all nodes and edges to a JSON snapshot at `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let inner = self.inner.read().await;
        let snapshot = Snapshot {
            nodes: inner.ordered().cloned().collect(),
            edges: inner.edges.clone(),
        };
        snapshot::write_json(path.as_ref(), &snapshot).await
    }

    /// Number of edges, mostly useful in tests.
    pub async fn edge_count(&self) -> usize {
        self.inner.read().await.edges.len()
    }

    /// Edges leaving `id`.
    pub async fn outgoing_edges(&self, id: &str) -> Vec<GraphEdge> {
        self.inner
            .read()
            .await
            .edges
            .iter()
            .filter(|e| e.source == id)
            .cloned()
            .collect()
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn ordered(&self) -> impl DoubleEndedIterator<Item = &GraphNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    fn insert(&mut self, node: GraphNode) {
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    fn create(&mut self, label: &str, properties: Properties) -> GraphNode {
        let node = GraphNode {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            properties,
        };
        self.insert(node.clone());
        node
    }

    /// Newest node matching, so a re-indexed document resolves to its latest node.
    fn find(&self, label: &str, key: &str, value: &str) -> Option<&GraphNode> {
        self.ordered()
            .rev()
            .find(|n| n.label == label && str_prop(&n.properties, key) == Some(value))
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn create_node(&self, label: &str, properties: Properties) -> Result<GraphNode> {
        Ok(self.inner.write().await.create(label, properties))
    }

    async fn create_or_get_node(
        &self,
        label: &str,
        key: &str,
        properties: Properties,
    ) -> Result<GraphNode> {
        let value = str_prop(&properties, key)
            .ok_or_else(|| {
                Error::InvalidInput(format!("node key property '{key}' must be a string"))
            })?
            .to_string();

        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.find(label, key, &value) {
            return Ok(existing.clone());
        }
        Ok(inner.create(label, properties))
    }

    async fn create_edge(
        &self,
        source: &str,
        target: &str,
        label: &str,
        properties: Properties,
    ) -> Result<GraphEdge> {
        let mut inner = self.inner.write().await;
        for end in [source, target] {
            if !inner.nodes.contains_key(end) {
                return Err(Error::NotFound(format!("node {end}")));
            }
        }

        let edge = GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: label.to_string(),
            properties,
        };
        inner.edges.push(edge.clone());
        Ok(edge)
    }

    async fn get_node(&self, id: &str) -> Result<GraphNode> {
        self.inner
            .read()
            .await
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {id}")))
    }

    async fn get_connected_nodes(
        &self,
        id: &str,
        edge_label: Option<&str>,
    ) -> Result<Vec<GraphNode>> {
        let inner = self.inner.read().await;
        let mut seen = HashSet::new();
        let mut connected = Vec::new();

        for edge in &inner.edges {
            if edge_label.is_some_and(|label| edge.label != label) {
                continue;
            }
            let neighbour = if edge.source == id {
                &edge.target
            } else if edge.target == id {
                &edge.source
            } else {
                continue;
            };
            if !seen.insert(neighbour.as_str()) {
                continue;
            }
            if let Some(node) = inner.nodes.get(neighbour) {
                connected.push(node.clone());
            }
        }

        Ok(connected)
    }

    async fn find_node(&self, label: &str, key: &str, value: &str) -> Result<Option<GraphNode>> {
        Ok(self.inner.read().await.find(label, key, value).cloned())
    }

    async fn nodes_with_label(&self, label: &str) -> Result<Vec<GraphNode>> {
        Ok(self
            .inner
            .read()
            .await
            .ordered()
            .filter(|n| n.label == label)
            .cloned()
            .collect())
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.nodes.remove(id).is_none() {
            return Err(Error::NotFound(format!("node {id}")));
        }
        inner.order.retain(|existing| existing != id);
        inner.edges.retain(|e| e.source != id && e.target != id);
        Ok(())
    }
}
