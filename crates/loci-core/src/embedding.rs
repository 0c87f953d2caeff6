//! Embedding support for the similarity path.
//!
//! `HashEmbedding` is a deterministic, offline reference embedder: tokens
//! are hashed into signed buckets and the result is L2-normalized. It keeps
//! `remember`/`recall` fully exercisable without a network-backed model.
//! `EmbeddingCache` avoids re-embedding identical text.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use loci_traits::{EmbeddingConfig, EmbeddingProvider};

/// Token-hashing embedder. Same text always yields the same vector;
/// texts sharing tokens land near each other under cosine similarity.
pub struct HashEmbedding {
    config: EmbeddingConfig,
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(EmbeddingConfig::default())
    }
}

impl HashEmbedding {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let normalized = self.normalize_text(text).to_lowercase();
        let mut vector = vec![0.0f32; self.config.dimension];

        for token in normalized.split_whitespace() {
            let digest = Sha256::digest(token.as_bytes());
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_be_bytes(prefix) % self.config.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// In-memory cache for embeddings to avoid redundant embedding work.
pub struct EmbeddingCache {
    cache: RwLock<HashMap<String, Vec<f32>>>,
    max_entries: usize,
}

impl EmbeddingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    fn cache_key(text: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(b":");
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, text: &str, model: &str) -> Option<Vec<f32>> {
        let key = Self::cache_key(text, model);
        self.cache.read().get(&key).cloned()
    }

    pub fn put(&self, text: &str, model: &str, embedding: Vec<f32>) {
        let key = Self::cache_key(text, model);
        let mut cache = self.cache.write();
        if cache.len() >= self.max_entries {
            let keys_to_remove: Vec<_> = cache.keys().take(self.max_entries / 2).cloned().collect();
            for k in keys_to_remove {
                cache.remove(&k);
            }
        }
        cache.insert(key, embedding);
    }
}
