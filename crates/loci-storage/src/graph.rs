//! In-memory graph provider backed by petgraph.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use tracing::debug;

use loci_models::{GraphEdge, GraphNode};
use loci_traits::{GraphProvider, Provider};

struct GraphInner {
    graph: StableDiGraph<GraphNode, GraphEdge>,
    ids: HashMap<String, NodeIndex>,
}

/// Directed property graph held in memory.
pub struct InMemoryGraph {
    inner: RwLock<GraphInner>,
}

impl Default for InMemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GraphInner {
                graph: StableDiGraph::new(),
                ids: HashMap::new(),
            }),
        }
    }

    /// Number of stored nodes.
    pub fn node_count(&self) -> usize {
        self.inner.read().graph.node_count()
    }

    /// Number of stored edges.
    pub fn edge_count(&self) -> usize {
        self.inner.read().graph.edge_count()
    }

    /// Fetch a node by id.
    pub fn node(&self, id: &str) -> Option<GraphNode> {
        let inner = self.inner.read();
        let idx = inner.ids.get(id)?;
        inner.graph.node_weight(*idx).cloned()
    }
}

#[async_trait]
impl Provider for InMemoryGraph {
    fn name(&self) -> &str {
        "in-memory-graph"
    }

    async fn initialize(&self) -> Result<()> {
        debug!(provider = self.name(), "initialized");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!(provider = self.name(), "closed");
        Ok(())
    }
}

#[async_trait]
impl GraphProvider for InMemoryGraph {
    async fn add_node(&self, node: GraphNode) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(idx) = inner.ids.get(&node.id).copied() {
            // Existing id: replace the node payload, keep incident edges.
            if let Some(weight) = inner.graph.node_weight_mut(idx) {
                *weight = node;
            }
            return Ok(());
        }
        let id = node.id.clone();
        let idx = inner.graph.add_node(node);
        inner.ids.insert(id, idx);
        Ok(())
    }

    async fn add_edge(&self, edge: GraphEdge) -> Result<()> {
        let mut inner = self.inner.write();
        let from = inner
            .ids
            .get(&edge.from)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown node '{}'", edge.from))?;
        let to = inner
            .ids
            .get(&edge.to)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown node '{}'", edge.to))?;
        inner.graph.add_edge(from, to, edge);
        Ok(())
    }

    async fn neighbors(&self, node_id: &str, edge_kind: Option<&str>) -> Result<Vec<GraphNode>> {
        let inner = self.inner.read();
        let Some(idx) = inner.ids.get(node_id).copied() else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for edge in inner.graph.edges_directed(idx, Direction::Outgoing) {
            if edge_kind.is_some_and(|kind| edge.weight().kind != kind) {
                continue;
            }
            if let Some(node) = inner.graph.node_weight(edge.target()) {
                if seen.insert(node.id.clone()) {
                    nodes.push(node.clone());
                }
            }
        }
        Ok(nodes)
    }

    async fn delete_node(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.write();
        let Some(idx) = inner.ids.remove(id) else {
            return Ok(false);
        };
        // StableDiGraph drops incident edges with the node.
        inner.graph.remove_node(idx);
        Ok(true)
    }
}
