//! Record types for the vector and graph provider contracts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored embedding with its attached metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Value,
}

/// One similarity-query hit. Results are ranked by `score` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Value,
}

/// A graph node with a node kind and free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub properties: Value,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, properties: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            properties,
        }
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: String,
    #[serde(default)]
    pub properties: Value,
}

impl GraphEdge {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        kind: impl Into<String>,
        properties: Value,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: kind.into(),
            properties,
        }
    }
}
