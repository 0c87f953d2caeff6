//! Loci Core - memory substrate for a stateful agent runtime.
//!
//! This crate provides:
//! - `ContextLockManager`: per-context FIFO mutual exclusion
//! - `WorkingMemory` / `WorkingMemorySet`: live transcripts with streaming
//!   subscriptions and checkpointed persistence
//! - `MemorySystem`: provider-abstracted facade over key-value, vector and
//!   graph storage with an explicit lifecycle
//! - `ExportManager`: pluggable episode export with JSON and Markdown
//!   built-ins
//!
//! Provider contracts live in `loci-traits`, the shared data model in
//! `loci-models`, and reference in-memory providers in `loci-storage`.

pub mod embedding;
pub mod error;
pub mod export;
pub mod lock;
pub mod memory;

pub use embedding::{EmbeddingCache, HashEmbedding};
pub use error::{MemoryError, Result};
pub use export::{ExportManager, Exporter, JsonExporter, MarkdownExporter};
pub use lock::ContextLockManager;
pub use memory::working::{LogListener, Subscription, WorkingMemory, WorkingMemorySet};
pub use memory::{
    LifecycleState, MemoryConfig, MemorySystem, MemorySystemBuilder, Recalled,
};
