//! Loci Storage - Reference in-memory providers.
//!
//! One implementation per capability contract from `loci-traits`:
//! - `InMemoryKv`: HashMap-backed exact-key store
//! - `InMemoryVectorIndex`: exact cosine scan with ranking, top-K and
//!   metadata filtering
//! - `InMemoryGraph`: petgraph-backed directed property graph
//!
//! All three are `Send + Sync` behind `parking_lot` locks and safe to share
//! across facades. They hold no external resources, so `initialize`/`close`
//! only log lifecycle transitions.

pub mod graph;
pub mod kv;
pub mod vector;

pub use graph::InMemoryGraph;
pub use kv::InMemoryKv;
pub use vector::{InMemoryVectorIndex, VectorIndexConfig};
