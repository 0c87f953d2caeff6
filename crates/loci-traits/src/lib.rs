//! Loci Traits - Provider capability contracts.
//!
//! Storage backends plug into the substrate by implementing one trait per
//! capability:
//! - `KeyValueProvider`: exact-key lookup
//! - `VectorProvider`: semantic similarity search
//! - `GraphProvider`: relational graph traversal
//!
//! All three extend the base `Provider` lifecycle contract. Backends report
//! failures as `anyhow::Result`; the facade in `loci-core` tags every
//! failure with the originating provider's name. `EmbeddingProvider` turns
//! text into vectors for the similarity path.

pub mod embedding;
pub mod provider;

pub use embedding::{EmbeddingConfig, EmbeddingProvider};
pub use provider::{GraphProvider, KeyValueProvider, Provider, VectorProvider};
