// crates/archon-core/src/core/logread.rs
// ============================================================================
// Module: Archon Log Reader
// Description: Dedupe-on-read for JSONL event logs.
// Purpose: Reconstruct a clean, ordered event stream from untrusted log bytes.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Log files are shared between cooperating writers (CLI and desktop UI on
//! one host), so the reader treats raw bytes as untrusted: partial trailing
//! lines are dropped, unparseable lines are counted, duplicates are collapsed
//! by `event_id` with first-seen wins, and timestamp regressions are surfaced
//! as an out-of-order signal rather than an error. Reading is idempotent:
//! reading a log formed by duplicating every line yields the same events as
//! reading the original.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;

use serde_json::Value;

// ============================================================================
// SECTION: Read Statistics
// ============================================================================

/// Statistics gathered while reading a log.
///
/// # Invariants
/// - `parsed_events <= total_lines`; `duplicates` counts dropped repeats.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogReadStats {
    /// Number of non-empty lines seen, including the partial trailing line.
    pub total_lines: usize,
    /// Number of lines that parsed into events carrying an `event_id`.
    pub parsed_events: usize,
    /// Number of entries dropped as duplicates of an earlier `event_id`.
    pub duplicates: usize,
    /// Number of lines that failed to parse as JSON objects.
    pub parse_errors: usize,
    /// True when the raw content ended without a terminal newline.
    pub partial_trailing_line: bool,
    /// True when more than one consecutive timestamp regression was seen.
    pub out_of_order: bool,
}

/// Result of a dedupe-on-read pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogReadOutcome {
    /// Deduplicated events sorted by `(timestamp, event_id)`.
    pub events: Vec<Value>,
    /// Read statistics.
    pub stats: LogReadStats,
}

// ============================================================================
// SECTION: Reader
// ============================================================================

/// Extracts a string field from a JSON object.
fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Reads raw log content into a deduplicated, ordered event stream.
#[must_use]
pub fn read_log(raw: &str) -> LogReadOutcome {
    let mut stats = LogReadStats::default();
    let mut segments: Vec<&str> = raw.split('\n').collect();
    // A terminal newline yields one empty trailing segment; anything else is
    // a partial line that a concurrent writer has not finished.
    if let Some(last) = segments.last() {
        if last.is_empty() {
            segments.pop();
        } else {
            stats.partial_trailing_line = true;
            segments.pop();
            stats.total_lines += 1;
        }
    }

    let mut events: Vec<Value> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut regressions = 0_usize;
    let mut previous_timestamp: Option<String> = None;

    for line in segments {
        if line.trim().is_empty() {
            continue;
        }
        stats.total_lines += 1;
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            stats.parse_errors += 1;
            continue;
        };
        let Some(event_id) = string_field(&value, "event_id").map(str::to_string) else {
            stats.parse_errors += 1;
            continue;
        };
        stats.parsed_events += 1;
        if !seen.insert(event_id) {
            stats.duplicates += 1;
            continue;
        }
        if let Some(timestamp) = string_field(&value, "timestamp") {
            if previous_timestamp.as_deref().is_some_and(|prev| timestamp < prev) {
                regressions += 1;
            }
            previous_timestamp = Some(timestamp.to_string());
        }
        events.push(value);
    }

    stats.out_of_order = regressions > 1;
    events.sort_by(|left, right| {
        let left_key =
            (string_field(left, "timestamp").unwrap_or(""), string_field(left, "event_id").unwrap_or(""));
        let right_key = (
            string_field(right, "timestamp").unwrap_or(""),
            string_field(right, "event_id").unwrap_or(""),
        );
        left_key.cmp(&right_key)
    });

    LogReadOutcome {
        events,
        stats,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use super::*;

    fn line(event_id: &str, timestamp: &str) -> String {
        format!(r#"{{"event_id":"{event_id}","timestamp":"{timestamp}"}}"#)
    }

    #[test]
    fn duplicates_are_collapsed_first_seen_wins() {
        let a = line("01A", "2026-01-01T00:00:00Z");
        let b = line("01B", "2026-01-01T00:00:01Z");
        let raw = format!("{a}\n{b}\n{a}\n");
        let outcome = read_log(&raw);
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(outcome.stats.duplicates, 1);
        assert_eq!(outcome.stats.parsed_events, 3);
    }

    #[test]
    fn dedupe_is_idempotent_under_full_duplication() {
        let a = line("01A", "2026-01-01T00:00:00Z");
        let b = line("01B", "2026-01-01T00:00:01Z");
        let clean = format!("{a}\n{b}\n");
        let doubled = format!("{a}\n{a}\n{b}\n{b}\n");
        assert_eq!(read_log(&clean).events, read_log(&doubled).events);
    }

    #[test]
    fn partial_trailing_line_is_dropped_and_flagged() {
        let a = line("01A", "2026-01-01T00:00:00Z");
        let raw = format!("{a}\n{{\"event_id\":\"01B\"");
        let outcome = read_log(&raw);
        assert_eq!(outcome.events.len(), 1);
        assert!(outcome.stats.partial_trailing_line);
    }

    #[test]
    fn unparseable_and_idless_lines_count_as_parse_errors() {
        let a = line("01A", "2026-01-01T00:00:00Z");
        let raw = format!("{a}\nnot-json\n{{\"timestamp\":\"x\"}}\n");
        let outcome = read_log(&raw);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.stats.parse_errors, 2);
    }

    #[test]
    fn events_are_sorted_by_timestamp_then_event_id() {
        let raw = format!(
            "{}\n{}\n{}\n",
            line("01C", "2026-01-01T00:00:02Z"),
            line("01B", "2026-01-01T00:00:01Z"),
            line("01A", "2026-01-01T00:00:01Z"),
        );
        let outcome = read_log(&raw);
        let ids: Vec<&str> =
            outcome.events.iter().filter_map(|event| string_field(event, "event_id")).collect();
        assert_eq!(ids, vec!["01A", "01B", "01C"]);
    }

    #[test]
    fn single_regression_is_tolerated() {
        let raw = format!(
            "{}\n{}\n{}\n",
            line("01A", "2026-01-01T00:00:02Z"),
            line("01B", "2026-01-01T00:00:01Z"),
            line("01C", "2026-01-01T00:00:03Z"),
        );
        assert!(!read_log(&raw).stats.out_of_order);
    }

    #[test]
    fn repeated_regressions_set_out_of_order() {
        let raw = format!(
            "{}\n{}\n{}\n{}\n",
            line("01A", "2026-01-01T00:00:04Z"),
            line("01B", "2026-01-01T00:00:03Z"),
            line("01C", "2026-01-01T00:00:05Z"),
            line("01D", "2026-01-01T00:00:01Z"),
        );
        assert!(read_log(&raw).stats.out_of_order);
    }

    #[test]
    fn empty_content_reads_cleanly() {
        let outcome = read_log("");
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.stats, LogReadStats::default());
    }
}
