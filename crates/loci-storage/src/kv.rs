//! In-memory key-value provider.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use loci_traits::{KeyValueProvider, Provider};

/// HashMap-backed key-value store. Last write wins, no versioning.
#[derive(Default)]
pub struct InMemoryKv {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// List all keys with optional prefix filter.
    pub fn list_keys(&self, prefix: Option<&str>) -> Vec<String> {
        self.entries
            .read()
            .keys()
            .filter(|k| prefix.is_none_or(|p| k.starts_with(p)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Provider for InMemoryKv {
    fn name(&self) -> &str {
        "in-memory-kv"
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
impl KeyValueProvider for InMemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }
}
