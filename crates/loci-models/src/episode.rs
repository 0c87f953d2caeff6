//! Episodes - immutable, bounded transcript excerpts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::log::LogEntry;

/// A completed transcript excerpt.
///
/// Episodes are built by an external boundary detector once it judges a
/// transcript slice complete, and are never mutated afterwards. The
/// substrate treats them as opaque snapshots: the export subsystem renders
/// them, nothing rewrites them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub context_id: String,
    /// Detector-assigned classification, e.g. `conversation` or `task`.
    pub kind: String,
    pub summary: String,
    /// Logs in the order they appeared in working memory when the episode
    /// was cut.
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub metadata: Value,
    /// When the episode was captured, epoch milliseconds.
    pub timestamp: i64,
    /// Timestamp of the first covered event.
    pub start_time: i64,
    /// Timestamp of the last covered event.
    pub end_time: i64,
    pub duration_ms: i64,
}
