//! Error types for the memory substrate core.

use thiserror::Error;

use crate::memory::LifecycleState;

/// Substrate error types.
///
/// Provider failures keep their backend cause and are tagged with the
/// originating provider's name. Export failures are not here: export
/// outcomes are result values, see `loci_models::ExportResult`.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory system is not initialized")]
    NotInitialized,

    #[error("memory system is not ready (state: {state})")]
    NotReady { state: LifecycleState },

    #[error("memory system already initialized (state: {state})")]
    AlreadyInitialized { state: LifecycleState },

    #[error("memory system is in failed state: provider '{provider}' failed to initialize")]
    Failed { provider: String },

    #[error("provider '{provider}' failed to initialize: {source}")]
    ProviderInitFailed {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("provider '{provider}' operation failed: {source}")]
    ProviderOperationFailed {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no {0} provider configured")]
    MissingProvider(&'static str),

    #[error("provider teardown failed: {0}")]
    CloseFailed(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for substrate operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
