//! Built-in Markdown exporter.

use std::fmt::Write;

use loci_models::{Episode, LogEntry};

use super::Exporter;

/// Human-readable Markdown export. Each episode becomes a document whose
/// first line is a heading carrying the episode id.
pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn supported_formats(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn default_format(&self) -> &str {
        "md"
    }

    fn render(&self, episodes: &[Episode], _format: &str) -> anyhow::Result<String> {
        let mut out = String::new();
        for (i, episode) in episodes.iter().enumerate() {
            if i > 0 {
                out.push_str("\n---\n\n");
            }
            render_episode(&mut out, episode)?;
        }
        Ok(out)
    }
}

fn render_episode(out: &mut String, episode: &Episode) -> anyhow::Result<()> {
    writeln!(out, "# Episode: {}", episode.id)?;
    writeln!(out)?;
    writeln!(out, "- Context: {}", episode.context_id)?;
    writeln!(out, "- Kind: {}", episode.kind)?;
    writeln!(out, "- Captured: {}", episode.timestamp)?;
    writeln!(
        out,
        "- Window: {} to {} ({} ms)",
        episode.start_time, episode.end_time, episode.duration_ms
    )?;
    writeln!(out)?;
    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "{}", episode.summary)?;

    if !episode.metadata.is_null() {
        writeln!(out)?;
        writeln!(out, "## Metadata")?;
        writeln!(out)?;
        writeln!(out, "```json")?;
        writeln!(out, "{}", serde_json::to_string_pretty(&episode.metadata)?)?;
        writeln!(out, "```")?;
    }

    writeln!(out)?;
    writeln!(out, "## Transcript")?;
    writeln!(out)?;
    for entry in &episode.logs {
        render_entry(out, entry)?;
    }
    Ok(())
}

fn render_entry(out: &mut String, entry: &LogEntry) -> anyhow::Result<()> {
    match entry {
        LogEntry::Input {
            id,
            timestamp,
            content,
        } => writeln!(out, "- `{id}` input @{timestamp}: {content}")?,
        LogEntry::Thought {
            id,
            timestamp,
            content,
        } => writeln!(out, "- `{id}` thought @{timestamp}: {content}")?,
        LogEntry::Output {
            id,
            timestamp,
            channel,
            content,
        } => writeln!(out, "- `{id}` output[{channel}] @{timestamp}: {content}")?,
        LogEntry::ActionCall {
            id,
            timestamp,
            action,
            data,
        } => writeln!(
            out,
            "- `{id}` action_call {action} @{timestamp}: {}",
            serde_json::to_string(data)?
        )?,
        LogEntry::ActionResult {
            id,
            timestamp,
            action,
            data,
        } => writeln!(
            out,
            "- `{id}` action_result {action} @{timestamp}: {}",
            serde_json::to_string(data)?
        )?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::ExportManager;
    use super::super::tests::sample_episode;
    use loci_models::ExportRequest;

    #[test]
    fn test_markdown_heading_carries_episode_id() {
        let manager = ExportManager::with_builtins();
        let request = ExportRequest::new(vec![sample_episode("e1")], "markdown");

        let result = manager.export(&request);
        assert!(result.success);

        let content = result.content.unwrap();
        assert!(content.starts_with("# Episode: e1"));
        assert!(content.contains("## Transcript"));
        assert!(content.contains("output[message]"));
    }

    #[test]
    fn test_markdown_accepts_both_format_names() {
        let manager = ExportManager::with_builtins();
        let base = ExportRequest::new(vec![sample_episode("e1")], "markdown");

        let md = manager.export(&base.clone().with_format("md"));
        let long = manager.export(&base.with_format("markdown"));
        assert!(md.success);
        assert!(long.success);
        assert_eq!(md.content, long.content);
    }

    #[test]
    fn test_multiple_episodes_are_separated() {
        let manager = ExportManager::with_builtins();
        let request = ExportRequest::new(vec![sample_episode("e1"), sample_episode("e2")], "markdown");

        let result = manager.export(&request);
        let content = result.content.unwrap();
        assert!(content.contains("# Episode: e1"));
        assert!(content.contains("# Episode: e2"));
        assert!(content.contains("\n---\n"));
    }

    #[test]
    fn test_markdown_export_is_deterministic() {
        let manager = ExportManager::with_builtins();
        let request = ExportRequest::new(vec![sample_episode("e1")], "markdown");

        assert_eq!(
            manager.export(&request).content,
            manager.export(&request).content
        );
    }
}
