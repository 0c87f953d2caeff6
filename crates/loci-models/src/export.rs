//! Export request/result value types.
//!
//! Export outcomes are plain values rather than errors: a batch caller
//! walks a list of episodes and keeps going past individual failures, so
//! every outcome carries a `success` flag instead of unwinding.

use serde::{Deserialize, Serialize};

use crate::episode::Episode;

/// A request to render episodes through a named exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub episodes: Vec<Episode>,
    /// Registered exporter name, e.g. `json` or `markdown`.
    pub exporter: String,
    /// Optional output format; the exporter's default is used when absent.
    #[serde(default)]
    pub format: Option<String>,
}

impl ExportRequest {
    pub fn new(episodes: Vec<Episode>, exporter: impl Into<String>) -> Self {
        Self {
            episodes,
            exporter: exporter.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Outcome of an export. Never an error type: inspect `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResult {
    pub success: bool,
    /// Resolved output format on success.
    pub format: Option<String>,
    /// Rendered content on success.
    pub content: Option<String>,
    pub error: Option<String>,
}

impl ExportResult {
    /// Create a successful export result.
    pub fn success(format: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            success: true,
            format: Some(format.into()),
            content: Some(content.into()),
            error: None,
        }
    }

    /// Create a failed export result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            format: None,
            content: None,
            error: Some(message.into()),
        }
    }
}

/// Listing entry describing one registered exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterInfo {
    pub name: String,
    pub supported_formats: Vec<String>,
}
