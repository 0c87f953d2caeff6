//! In-memory vector index with exact cosine scan.
//!
//! Records are kept in a map and every query scores the full set. This is
//! the reference semantics for the vector contract: ranking is exact,
//! filtering is a metadata equality match, ties break on id so repeated
//! queries return identical orderings.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use loci_models::VectorMatch;
use loci_traits::{Provider, VectorProvider};

/// Configuration for the in-memory vector index.
#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    /// Vector dimension; upserts and queries with any other length fail.
    pub dimension: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

struct StoredVector {
    embedding: Vec<f32>,
    metadata: Value,
}

/// Exact-scan vector store.
pub struct InMemoryVectorIndex {
    config: VectorIndexConfig,
    records: RwLock<HashMap<String, StoredVector>>,
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new(VectorIndexConfig::default())
    }
}

impl InMemoryVectorIndex {
    pub fn new(config: VectorIndexConfig) -> Self {
        Self {
            config,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.config.dimension {
            anyhow::bail!(
                "vector dimension mismatch: expected {}, got {}",
                self.config.dimension,
                len
            );
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Every field of `filter` must equal the corresponding metadata field.
fn matches_filter(metadata: &Value, filter: &Value) -> Result<bool> {
    let Some(fields) = filter.as_object() else {
        anyhow::bail!("vector query filter must be a JSON object");
    };
    Ok(fields
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected)))
}

#[async_trait]
impl Provider for InMemoryVectorIndex {
    fn name(&self) -> &str {
        "in-memory-vector"
    }

    async fn initialize(&self) -> Result<()> {
        debug!(
            provider = self.name(),
            dimension = self.config.dimension,
            "initialized"
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!(provider = self.name(), "closed");
        Ok(())
    }
}

#[async_trait]
impl VectorProvider for InMemoryVectorIndex {
    async fn upsert(&self, id: &str, embedding: &[f32], metadata: Value) -> Result<()> {
        self.check_dimension(embedding.len())?;
        self.records.write().insert(
            id.to_string(),
            StoredVector {
                embedding: embedding.to_vec(),
                metadata,
            },
        );
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Value>,
    ) -> Result<Vec<VectorMatch>> {
        self.check_dimension(embedding.len())?;

        let records = self.records.read();
        let mut matches = Vec::new();
        for (id, stored) in records.iter() {
            if let Some(filter) = filter {
                if !matches_filter(&stored.metadata, filter)? {
                    continue;
                }
            }
            matches.push(VectorMatch {
                id: id.clone(),
                score: cosine_similarity(embedding, &stored.embedding),
                metadata: stored.metadata.clone(),
            });
        }

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index(dimension: usize) -> InMemoryVectorIndex {
        InMemoryVectorIndex::new(VectorIndexConfig { dimension })
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let store = index(2);
        store.upsert("x", &[1.0, 0.0], json!({})).await.unwrap();
        store.upsert("y", &[0.7, 0.7], json!({})).await.unwrap();
        store.upsert("z", &[0.0, 1.0], json!({})).await.unwrap();

        let matches = store.query(&[1.0, 0.0], 10, None).await.unwrap();
        let ids: Vec<_> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        assert!(matches[0].score > matches[1].score);
        assert!(matches[1].score > matches[2].score);
    }

    #[tokio::test]
    async fn test_top_k_cutoff() {
        let store = index(2);
        store.upsert("x", &[1.0, 0.0], json!({})).await.unwrap();
        store.upsert("y", &[0.7, 0.7], json!({})).await.unwrap();
        store.upsert("z", &[0.0, 1.0], json!({})).await.unwrap();

        let matches = store.query(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "x");
    }

    #[tokio::test]
    async fn test_metadata_filter() {
        let store = index(2);
        store
            .upsert("x", &[1.0, 0.0], json!({"topic": "rust"}))
            .await
            .unwrap();
        store
            .upsert("y", &[1.0, 0.0], json!({"topic": "go"}))
            .await
            .unwrap();

        let filter = json!({"topic": "rust"});
        let matches = store.query(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "x");
    }

    #[tokio::test]
    async fn test_non_object_filter_rejected() {
        let store = index(2);
        store.upsert("x", &[1.0, 0.0], json!({})).await.unwrap();

        let filter = json!("topic");
        assert!(store.query(&[1.0, 0.0], 10, Some(&filter)).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = index(2);
        store
            .upsert("x", &[1.0, 0.0], json!({"v": 1}))
            .await
            .unwrap();
        store
            .upsert("x", &[0.0, 1.0], json!({"v": 2}))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let matches = store.query(&[0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(matches[0].metadata, json!({"v": 2}));
        assert!(matches[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = index(2);
        assert!(store.upsert("x", &[1.0], json!({})).await.is_err());
        assert!(store.query(&[1.0, 0.0, 0.0], 1, None).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = index(2);
        store.upsert("x", &[1.0, 0.0], json!({})).await.unwrap();

        assert!(store.delete("x").await.unwrap());
        assert!(!store.delete("x").await.unwrap());
        assert!(store.query(&[1.0, 0.0], 10, None).await.unwrap().is_empty());
    }
}
