use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::graph::{GraphStore, CONTAINS_EDGE, DOCUMENT_LABEL, MODULE_LABEL};
use crate::store::VectorStore;
use crate::Result;

/// What a reconciliation sweep found
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Vectors no document node points at
    pub orphan_vectors: Vec<String>,
    /// Document nodes whose `vectorId` is missing or dangling
    pub orphan_nodes: Vec<String>,
    /// Module nodes left without any remaining document
    pub empty_modules: Vec<String>,
    /// Whether the orphans were deleted
    pub applied: bool,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.orphan_vectors.is_empty()
            && self.orphan_nodes.is_empty()
            && self.empty_modules.is_empty()
    }
}

/// Repairs the stores after partially failed indexing by discarding records
/// that lost their counterpart.
///
/// Run it while no indexing is in progress: a vector whose node is still being
/// written looks exactly like an orphan.
pub struct Reconciler<V: ?Sized, G: ?Sized> {
    vectors: Arc<V>,
    graph: Arc<G>,
}

impl<V, G> Reconciler<V, G>
where
    V: VectorStore + ?Sized,
    G: GraphStore + ?Sized,
{
    #[must_use]
    pub fn new(vectors: Arc<V>, graph: Arc<G>) -> Self {
        Self { vectors, graph }
    }

    /// Find orphans and, unless `dry_run`, delete them.
    pub async fn sweep(&self, dry_run: bool) -> Result<ReconcileReport> {
        let records = self.vectors.records().await?;
        let documents = self.graph.nodes_with_label(DOCUMENT_LABEL).await?;

        let vector_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let linked: HashSet<&str> = documents.iter().filter_map(|n| n.vector_id()).collect();

        let orphan_vectors: Vec<String> = records
            .iter()
            .filter(|r| !linked.contains(r.id.as_str()))
            .map(|r| r.id.clone())
            .collect();

        let orphan_nodes: Vec<String> = documents
            .iter()
            .filter(|n| !n.vector_id().is_some_and(|id| vector_ids.contains(id)))
            .map(|n| n.id.clone())
            .collect();

        let doomed: HashSet<&str> = orphan_nodes.iter().map(String::as_str).collect();
        let mut empty_modules = Vec::new();
        for module in self.graph.nodes_with_label(MODULE_LABEL).await? {
            let remaining = self
                .graph
                .get_connected_nodes(&module.id, Some(CONTAINS_EDGE))
                .await?
                .into_iter()
                .filter(|n| n.is_document() && !doomed.contains(n.id.as_str()))
                .count();
            if remaining == 0 {
                empty_modules.push(module.id);
            }
        }

        let mut report = ReconcileReport {
            orphan_vectors,
            orphan_nodes,
            empty_modules,
            applied: false,
        };

        if report.is_clean() {
            info!("Reconciliation: stores are consistent");
            return Ok(report);
        }

        warn!(
            "Reconciliation: {} orphan vector(s), {} orphan node(s), {} empty module(s)",
            report.orphan_vectors.len(),
            report.orphan_nodes.len(),
            report.empty_modules.len()
        );

        if dry_run {
            return Ok(report);
        }

        for id in &report.orphan_vectors {
            self.vectors.delete(id).await?;
        }
        for id in report.orphan_nodes.iter().chain(&report.empty_modules) {
            self.graph.delete_node(id).await?;
        }
        report.applied = true;

        Ok(report)
    }
}
