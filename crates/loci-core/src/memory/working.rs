//! Working memory - the live transcript of a context's current run.
//!
//! Each context owns one ordered `LogEntry` sequence, mutated only inside
//! that context's lock. Appends deduplicate by entry id: re-appending an
//! existing id replaces the old occurrence at the tail, which is how
//! streaming content (a thought growing chunk by chunk) is modeled.
//!
//! The in-process sequence is authoritative during an active run. The
//! persisted copy in the key-value provider is a checkpointed cache,
//! flushed at run boundaries rather than on every append.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use loci_models::LogEntry;
use loci_traits::KeyValueProvider;

use crate::error::{MemoryError, Result};

/// Callback invoked for every append on a subscribed context.
/// The flag is `true` for a finalized entry, `false` for an in-progress
/// streaming update.
pub type LogListener = Arc<dyn Fn(&LogEntry, bool) + Send + Sync>;

/// Ordered event sequence for one context.
#[derive(Debug, Clone, Default)]
pub struct WorkingMemory {
    context_id: String,
    entries: Vec<LogEntry>,
}

impl WorkingMemory {
    pub fn new(context_id: impl Into<String>) -> Self {
        Self {
            context_id: context_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Append an entry, deduplicating by id.
    ///
    /// If an entry with the same id already exists it is removed first and
    /// the new entry lands at the tail: last write wins and the position
    /// resets to most-recently-updated. This means a late update to an old
    /// id reorders it after newer, unrelated entries; callers that need
    /// strict chronological order of distinct ids must sort by timestamp.
    pub fn append(&mut self, entry: LogEntry) {
        if let Some(pos) = self.entries.iter().position(|e| e.id() == entry.id()) {
            self.entries.remove(pos);
        }
        self.entries.push(entry);
    }

    /// Detached copy of the sequence in append order (post-dedup).
    /// Mutating the copy never affects stored state.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

type ListenerMap = Mutex<HashMap<String, Vec<(u64, LogListener)>>>;

/// Per-context listener registry.
struct LogBus {
    listeners: ListenerMap,
    next_id: AtomicU64,
}

impl LogBus {
    fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn subscribe(self: &Arc<Self>, context_id: &str, listener: LogListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(context_id.to_string())
            .or_default()
            .push((id, listener));
        Subscription {
            bus: Arc::clone(self),
            context_id: context_id.to_string(),
            id,
        }
    }

    fn remove(&self, context_id: &str, id: u64) {
        let mut listeners = self.listeners.lock();
        if let Some(subs) = listeners.get_mut(context_id) {
            subs.retain(|(sub_id, _)| *sub_id != id);
            if subs.is_empty() {
                listeners.remove(context_id);
            }
        }
    }

    fn emit(&self, context_id: &str, entry: &LogEntry, is_final: bool) {
        // Clone the listener list out of the lock so callbacks run unlocked
        // and may themselves subscribe or unsubscribe.
        let subs: Vec<LogListener> = self
            .listeners
            .lock()
            .get(context_id)
            .map(|subs| subs.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        for listener in subs {
            listener(entry, is_final);
        }
    }
}

/// Subscription handle. Dropping it unsubscribes the listener.
pub struct Subscription {
    bus: Arc<LogBus>,
    context_id: String,
    id: u64,
}

impl Subscription {
    /// Explicitly remove the listener. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.remove(&self.context_id, self.id);
    }
}

/// Owns the live working memories of all contexts plus their listeners
/// and the checkpointed persistence path.
pub struct WorkingMemorySet {
    memories: Mutex<HashMap<String, WorkingMemory>>,
    bus: Arc<LogBus>,
    key_prefix: String,
}

impl Default for WorkingMemorySet {
    fn default() -> Self {
        Self::new("working_memory:")
    }
}

impl WorkingMemorySet {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            memories: Mutex::new(HashMap::new()),
            bus: Arc::new(LogBus::new()),
            key_prefix: key_prefix.into(),
        }
    }

    /// Deterministic key-value key for a context's persisted transcript.
    pub fn storage_key(&self, context_id: &str) -> String {
        format!("{}{}", self.key_prefix, context_id)
    }

    /// Append a finalized entry to `context_id`'s transcript and notify
    /// subscribers with `is_final = true`.
    pub fn append(&self, context_id: &str, entry: LogEntry) {
        self.push(context_id, entry, true);
    }

    /// Append an in-progress streaming update and notify subscribers with
    /// `is_final = false`. Callers finish the stream with one `append` for
    /// the same id.
    pub fn append_partial(&self, context_id: &str, entry: LogEntry) {
        self.push(context_id, entry, false);
    }

    fn push(&self, context_id: &str, entry: LogEntry, is_final: bool) {
        {
            let mut memories = self.memories.lock();
            memories
                .entry(context_id.to_string())
                .or_insert_with(|| WorkingMemory::new(context_id))
                .append(entry.clone());
        }
        self.bus.emit(context_id, &entry, is_final);
    }

    /// Register a listener for every append on `context_id`. Many
    /// independent listeners per context are supported; each receives
    /// every notification.
    pub fn subscribe(&self, context_id: &str, listener: LogListener) -> Subscription {
        self.bus.subscribe(context_id, listener)
    }

    /// Detached copy of `context_id`'s transcript, empty if the context
    /// has no live working memory.
    pub fn snapshot(&self, context_id: &str) -> Vec<LogEntry> {
        self.memories
            .lock()
            .get(context_id)
            .map(|wm| wm.snapshot())
            .unwrap_or_default()
    }

    pub fn len(&self, context_id: &str) -> usize {
        self.memories
            .lock()
            .get(context_id)
            .map(|wm| wm.len())
            .unwrap_or(0)
    }

    /// Drop `context_id`'s live transcript. The persisted checkpoint, if
    /// any, is untouched.
    pub fn clear(&self, context_id: &str) {
        self.memories.lock().remove(context_id);
    }

    /// Checkpoint `context_id`'s transcript through the key-value provider.
    pub async fn save(&self, context_id: &str, kv: &dyn KeyValueProvider) -> Result<()> {
        let entries = self.snapshot(context_id);
        let value = serde_json::to_value(&entries)?;
        kv.set(&self.storage_key(context_id), value)
            .await
            .map_err(|source| MemoryError::ProviderOperationFailed {
                provider: kv.name().to_string(),
                source,
            })?;
        debug!(context_id, entries = entries.len(), "working memory saved");
        Ok(())
    }

    /// Load `context_id`'s last checkpoint, replacing any live transcript.
    /// Yields the restored entries; an absent checkpoint restores empty.
    pub async fn restore(
        &self,
        context_id: &str,
        kv: &dyn KeyValueProvider,
    ) -> Result<Vec<LogEntry>> {
        let stored = kv
            .get(&self.storage_key(context_id))
            .await
            .map_err(|source| MemoryError::ProviderOperationFailed {
                provider: kv.name().to_string(),
                source,
            })?;

        let entries: Vec<LogEntry> = match stored {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };

        let mut restored = WorkingMemory::new(context_id);
        for entry in &entries {
            restored.append(entry.clone());
        }
        self.memories
            .lock()
            .insert(context_id.to_string(), restored);
        debug!(context_id, entries = entries.len(), "working memory restored");
        Ok(entries)
    }
}
