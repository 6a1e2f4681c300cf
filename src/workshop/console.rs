//! Console sink: the user-facing diagnostic log of a workshop.
//!
//! Entries are kept most-recent-first and capped at [`CONSOLE_CAPACITY`].
//! Every entry is mirrored to `tracing` so operators see the same stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::preview::PREVIEW_SOURCE;

/// Maximum number of retained console entries.
pub const CONSOLE_CAPACITY: usize = 100;

/// Prefix for messages forwarded from the preview sandbox.
pub const PREVIEW_PREFIX: &str = "[preview] ";

/// Severity of a console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    /// Plain output.
    Log,
    /// Failure.
    Error,
    /// Lifecycle information.
    Info,
    /// Recoverable problem or no-op.
    Warn,
}

/// A single console entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Millisecond timestamp, strictly increasing across entries.
    pub id: i64,
    /// Severity.
    #[serde(rename = "type")]
    pub level: ConsoleLevel,
    /// Message text.
    pub message: String,
}

/// Append-only, capped, most-recent-first log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsoleSink {
    entries: Vec<ConsoleMessage>,
}

/// Message posted by the preview bridge script.
#[derive(Deserialize)]
struct PreviewMessage {
    source: String,
    level: String,
    message: String,
}

impl ConsoleSink {
    /// Appends an entry stamped with `now`, evicting the oldest beyond capacity.
    pub fn push(
        &mut self,
        now: DateTime<Utc>,
        level: ConsoleLevel,
        message: impl Into<String>,
    ) -> &ConsoleMessage {
        let message = message.into();
        match level {
            ConsoleLevel::Error => tracing::error!(target: "workshop::console", "{message}"),
            ConsoleLevel::Warn => tracing::warn!(target: "workshop::console", "{message}"),
            ConsoleLevel::Info | ConsoleLevel::Log => {
                tracing::info!(target: "workshop::console", "{message}");
            }
        }

        let stamp = now.timestamp_millis();
        let id = self.entries.first().map_or(stamp, |latest| stamp.max(latest.id + 1));
        self.entries.insert(0, ConsoleMessage { id, level, message });
        self.entries.truncate(CONSOLE_CAPACITY);
        &self.entries[0]
    }

    /// Ingests a message forwarded from the preview sandbox.
    ///
    /// Returns `false` (and records nothing) for payloads that are not JSON
    /// or did not originate from the preview bridge.
    pub fn accept_preview_message(&mut self, now: DateTime<Utc>, raw: &str) -> bool {
        let Ok(forwarded) = serde_json::from_str::<PreviewMessage>(raw) else {
            return false;
        };
        if forwarded.source != PREVIEW_SOURCE {
            return false;
        }
        let level = match forwarded.level.as_str() {
            "error" => ConsoleLevel::Error,
            "warn" => ConsoleLevel::Warn,
            "info" => ConsoleLevel::Info,
            _ => ConsoleLevel::Log,
        };
        self.push(now, level, format!("{PREVIEW_PREFIX}{}", forwarded.message));
        true
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries, most recent first.
    #[must_use]
    pub fn entries(&self) -> &[ConsoleMessage] {
        &self.entries
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&ConsoleMessage> {
        self.entries.first()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sink is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn newest_entry_comes_first() {
        let mut sink = ConsoleSink::default();
        sink.push(at(1_000), ConsoleLevel::Info, "first");
        sink.push(at(2_000), ConsoleLevel::Warn, "second");

        assert_eq!(sink.entries()[0].message, "second");
        assert_eq!(sink.entries()[1].message, "first");
    }

    #[test]
    fn ids_strictly_increase_even_when_clock_stalls() {
        let mut sink = ConsoleSink::default();
        sink.push(at(5_000), ConsoleLevel::Info, "a");
        sink.push(at(5_000), ConsoleLevel::Info, "b");
        sink.push(at(4_000), ConsoleLevel::Info, "c");

        let ids: Vec<i64> = sink.entries().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![5_002, 5_001, 5_000]);
    }

    #[test]
    fn capacity_drops_oldest_entries() {
        let mut sink = ConsoleSink::default();
        for i in 0..250 {
            sink.push(at(i), ConsoleLevel::Log, format!("entry {i}"));
        }

        assert_eq!(sink.len(), CONSOLE_CAPACITY);
        assert_eq!(sink.entries()[0].message, "entry 249");
        assert_eq!(sink.entries()[CONSOLE_CAPACITY - 1].message, "entry 150");
    }

    #[test]
    fn clear_empties_the_sink() {
        let mut sink = ConsoleSink::default();
        sink.push(at(1), ConsoleLevel::Error, "boom");
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn preview_messages_are_prefixed() {
        let mut sink = ConsoleSink::default();
        let raw = r#"{"source":"workshop-preview","level":"error","message":"x is undefined"}"#;

        assert!(sink.accept_preview_message(at(1), raw));
        let latest = sink.latest().unwrap();
        assert_eq!(latest.level, ConsoleLevel::Error);
        assert_eq!(latest.message, "[preview] x is undefined");
    }

    #[test]
    fn foreign_or_malformed_messages_are_ignored() {
        let mut sink = ConsoleSink::default();
        assert!(!sink.accept_preview_message(at(1), "not json"));
        assert!(!sink.accept_preview_message(
            at(1),
            r#"{"source":"devtools","level":"log","message":"hi"}"#
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn serializes_with_original_field_names() {
        let mut sink = ConsoleSink::default();
        sink.push(at(7), ConsoleLevel::Warn, "careful");
        let json = serde_json::to_value(&sink).unwrap();
        assert_eq!(json, serde_json::json!([{"id": 7, "type": "warn", "message": "careful"}]));
    }
}
