//! Loci Models - Shared data model for the memory substrate.
//!
//! This crate defines the value types exchanged between the substrate's
//! components:
//! - LogEntry: tagged transcript event (input, thought, output, action call/result)
//! - Episode: immutable, bounded transcript excerpt built by an external detector
//! - Vector and graph record types used by the provider contracts
//! - Export request/result value types

pub mod episode;
pub mod export;
pub mod log;
pub mod records;
pub mod time;

pub use episode::Episode;
pub use export::{ExportRequest, ExportResult, ExporterInfo};
pub use log::LogEntry;
pub use records::{GraphEdge, GraphNode, VectorMatch, VectorRecord};
pub use time::now_ms;
