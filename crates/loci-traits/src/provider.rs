//! Storage provider contracts.
//!
//! Each capability is an independent trait a backend may implement.
//! Implementations are provided by downstream crates; `loci-storage` ships
//! reference in-memory ones. A provider shared by multiple facades must
//! document its own concurrency safety: the substrate adds no
//! synchronization around provider calls beyond the per-context lock.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use loci_models::{GraphEdge, GraphNode, VectorMatch};

/// Base lifecycle contract shared by every storage provider.
///
/// `initialize` is invoked exactly once by the owning facade before any
/// capability call; `close` exactly once during teardown. Neither is
/// retried.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider name, used to tag propagated errors.
    fn name(&self) -> &str;

    /// Perform backend setup (open connections, create tables).
    async fn initialize(&self) -> Result<()>;

    /// Release backend resources.
    async fn close(&self) -> Result<()>;
}

/// Exact-key storage. Values are opaque JSON, last-write-wins.
#[async_trait]
pub trait KeyValueProvider: Provider {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any prior value.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Similarity-searchable embedding storage.
#[async_trait]
pub trait VectorProvider: Provider {
    /// Insert or replace the record stored under `id`.
    async fn upsert(&self, id: &str, embedding: &[f32], metadata: Value) -> Result<()>;

    /// Rank stored records by similarity to `embedding`, best first.
    ///
    /// `filter`, when present, must be a JSON object; a record matches only
    /// if every filter field equals the corresponding metadata field.
    /// At most `top_k` matches are returned.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Value>,
    ) -> Result<Vec<VectorMatch>>;

    /// Remove the record under `id`. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Directed property graph with typed edges.
#[async_trait]
pub trait GraphProvider: Provider {
    /// Insert or replace a node keyed by its id.
    async fn add_node(&self, node: GraphNode) -> Result<()>;

    /// Insert a directed edge. Both endpoints must already exist.
    async fn add_edge(&self, edge: GraphEdge) -> Result<()>;

    /// Nodes reachable over one outgoing edge from `node_id`, optionally
    /// restricted to edges of `edge_kind`. Each neighbor appears once.
    async fn neighbors(&self, node_id: &str, edge_kind: Option<&str>) -> Result<Vec<GraphNode>>;

    /// Remove a node and all its incident edges. Returns whether it existed.
    async fn delete_node(&self, id: &str) -> Result<bool>;
}
