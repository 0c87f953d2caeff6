//! Transcript log entries.
//!
//! A working memory is an ordered sequence of `LogEntry` values. Entries are
//! identified by an id that is unique within one working memory; appending an
//! entry under an existing id replaces the prior occurrence (see
//! `loci-core`'s working-memory module for the exact semantics).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::now_ms;

/// A single transcript event.
///
/// Serialized with a `type` tag so persisted transcripts remain readable
/// and stable across versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    /// External input handed to the context (user message, event payload).
    Input {
        id: String,
        timestamp: i64,
        content: String,
    },
    /// Intermediate reasoning produced while a run is in flight.
    Thought {
        id: String,
        timestamp: i64,
        content: String,
    },
    /// Content emitted by the context, classified by an output channel
    /// such as `message` or `artifact`.
    Output {
        id: String,
        timestamp: i64,
        channel: String,
        content: String,
    },
    /// An invocation of a named action with structured arguments.
    ActionCall {
        id: String,
        timestamp: i64,
        action: String,
        data: Value,
    },
    /// The structured result of a previously issued action call.
    ActionResult {
        id: String,
        timestamp: i64,
        action: String,
        data: Value,
    },
}

impl LogEntry {
    /// Create an input entry stamped with the current time.
    pub fn input(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Input {
            id: id.into(),
            timestamp: now_ms(),
            content: content.into(),
        }
    }

    /// Create a thought entry stamped with the current time.
    pub fn thought(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Thought {
            id: id.into(),
            timestamp: now_ms(),
            content: content.into(),
        }
    }

    /// Create an output entry stamped with the current time.
    pub fn output(
        id: impl Into<String>,
        channel: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Output {
            id: id.into(),
            timestamp: now_ms(),
            channel: channel.into(),
            content: content.into(),
        }
    }

    /// Create an action-call entry stamped with the current time.
    pub fn action_call(
        id: impl Into<String>,
        action: impl Into<String>,
        data: Value,
    ) -> Self {
        Self::ActionCall {
            id: id.into(),
            timestamp: now_ms(),
            action: action.into(),
            data,
        }
    }

    /// Create an action-result entry stamped with the current time.
    pub fn action_result(
        id: impl Into<String>,
        action: impl Into<String>,
        data: Value,
    ) -> Self {
        Self::ActionResult {
            id: id.into(),
            timestamp: now_ms(),
            action: action.into(),
            data,
        }
    }

    /// Entry id, unique within one working memory.
    pub fn id(&self) -> &str {
        match self {
            Self::Input { id, .. }
            | Self::Thought { id, .. }
            | Self::Output { id, .. }
            | Self::ActionCall { id, .. }
            | Self::ActionResult { id, .. } => id,
        }
    }

    /// Creation timestamp in epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Input { timestamp, .. }
            | Self::Thought { timestamp, .. }
            | Self::Output { timestamp, .. }
            | Self::ActionCall { timestamp, .. }
            | Self::ActionResult { timestamp, .. } => *timestamp,
        }
    }

    /// Variant name as used in the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::Thought { .. } => "thought",
            Self::Output { .. } => "output",
            Self::ActionCall { .. } => "action_call",
            Self::ActionResult { .. } => "action_result",
        }
    }
}
