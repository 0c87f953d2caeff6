//! Built-in JSON exporter.

use loci_models::Episode;

use super::Exporter;

/// Lossless JSON export. Every episode field serializes as-is; map keys
/// come out sorted, so repeated renders are byte-identical.
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn name(&self) -> &str {
        "json"
    }

    fn supported_formats(&self) -> &[&str] {
        &["json"]
    }

    fn default_format(&self) -> &str {
        "json"
    }

    fn render(&self, episodes: &[Episode], _format: &str) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(episodes)?)
    }
}
