//! Episode export.
//!
//! Exporters are named formatters turning bounded episodes into output
//! content. The registry is instance-owned, never process-global, so
//! independent managers can coexist (isolated test runs, per-tenant
//! format sets). Export outcomes are values: a failed lookup or an
//! unsupported format yields a failure result, not an error, so batch
//! callers continue past individual failures.

mod json;
mod markdown;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use loci_models::{Episode, ExportRequest, ExportResult, ExporterInfo};

pub use json::JsonExporter;
pub use markdown::MarkdownExporter;

/// A named, pluggable episode formatter.
pub trait Exporter: Send + Sync {
    /// Registry name, e.g. `json`.
    fn name(&self) -> &str;

    /// Formats this exporter can render.
    fn supported_formats(&self) -> &[&str];

    /// Format used when the request does not name one.
    fn default_format(&self) -> &str;

    /// Render episodes into output content.
    ///
    /// Must be deterministic: the same episodes and format yield
    /// byte-identical content on every call.
    fn render(&self, episodes: &[Episode], format: &str) -> anyhow::Result<String>;
}

/// Registry of exporters for one consumer.
pub struct ExportManager {
    exporters: HashMap<String, Arc<dyn Exporter>>,
}

impl Default for ExportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            exporters: HashMap::new(),
        }
    }

    /// Create a manager with the built-in JSON and Markdown exporters.
    pub fn with_builtins() -> Self {
        let mut manager = Self::new();
        manager.register(JsonExporter);
        manager.register(MarkdownExporter);
        manager
    }

    /// Register an exporter, replacing any prior one with the same name.
    pub fn register<E: Exporter + 'static>(&mut self, exporter: E) {
        self.register_arc(Arc::new(exporter));
    }

    /// Register an exporter from Arc.
    pub fn register_arc(&mut self, exporter: Arc<dyn Exporter>) {
        let name = exporter.name().to_string();
        debug!(exporter = name.as_str(), "exporter registered");
        self.exporters.insert(name, exporter);
    }

    /// Remove an exporter by name. Returns whether it was registered.
    /// Subsequent exports under that name behave as if it never existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.exporters.remove(name).is_some()
    }

    /// Check if an exporter is registered.
    pub fn has(&self, name: &str) -> bool {
        self.exporters.contains_key(name)
    }

    /// List registered exporters and their formats.
    pub fn list(&self) -> Vec<ExporterInfo> {
        let mut infos: Vec<_> = self
            .exporters
            .values()
            .map(|e| ExporterInfo {
                name: e.name().to_string(),
                supported_formats: e
                    .supported_formats()
                    .iter()
                    .map(|f| f.to_string())
                    .collect(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Render a batch of episodes through a named exporter.
    pub fn export(&self, request: &ExportRequest) -> ExportResult {
        let Some(exporter) = self.exporters.get(&request.exporter) else {
            return ExportResult::error(format!("Exporter '{}' not found", request.exporter));
        };

        let format = match &request.format {
            Some(format) if !exporter.supported_formats().contains(&format.as_str()) => {
                return ExportResult::error(format!("Format '{format}' not supported"));
            }
            Some(format) => format.clone(),
            None => exporter.default_format().to_string(),
        };

        match exporter.render(&request.episodes, &format) {
            Ok(content) => {
                debug!(
                    exporter = request.exporter.as_str(),
                    format = format.as_str(),
                    episodes = request.episodes.len(),
                    "episodes exported"
                );
                ExportResult::success(format, content)
            }
            Err(error) => ExportResult::error(format!("{error:#}")),
        }
    }
}
