// crates/archon-core/src/core/time.rs
// ============================================================================
// Module: Archon Time Model
// Description: RFC 3339 timestamps and the injectable clock.
// Purpose: Keep snapshot construction and log records deterministic and replayable.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Archon embeds explicit RFC 3339 timestamps in snapshots and log records.
//! The core never reads wall-clock time directly; callers inject a [`Clock`]
//! so tests and replay can hold time fixed. Snapshot determinism (two builds
//! with equal inputs and equal clock output hash identically) depends on this
//! injection point.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical RFC 3339 timestamp used in Archon snapshots and logs.
///
/// # Invariants
/// - The wire form is an RFC 3339 string; values from the same clock share a
///   format, so lexicographic order matches temporal order.
/// - No validation is applied on deserialization; log readers treat
///   timestamps as untrusted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Wraps an RFC 3339 string without validation.
    #[must_use]
    pub fn from_rfc3339(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the timestamp as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of timestamps injected into snapshot builds and log appends.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Wall-clock implementation used by binaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = OffsetDateTime::now_utc();
        // Formatting an in-range OffsetDateTime with Rfc3339 cannot fail; fall
        // back to the unix-second form rather than panic if it ever does.
        now.format(&Rfc3339).map_or_else(
            |_| Timestamp(format!("{}", now.unix_timestamp())),
            Timestamp,
        )
    }
}

/// Fixed clock returning a preset timestamp, for tests and replay.
#[derive(Debug, Clone)]
pub struct FixedClock {
    /// The timestamp returned by every `now` call.
    at: Timestamp,
}

impl FixedClock {
    /// Creates a fixed clock pinned to the provided RFC 3339 string.
    #[must_use]
    pub fn new(at: impl Into<String>) -> Self {
        Self {
            at: Timestamp::from_rfc3339(at),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.at.clone()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
