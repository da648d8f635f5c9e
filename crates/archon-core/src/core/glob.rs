// crates/archon-core/src/core/glob.rs
// ============================================================================
// Module: Archon Glob Matcher
// Description: Pure `*` / `**` path matching with `./` normalization.
// Purpose: Back restriction-rule conditions with deterministic path matching.
// Dependencies: regex, thiserror
// ============================================================================

//! ## Overview
//! Restriction conditions match paths with a two-operator glob language:
//! `**` matches any sequence including `/`, `*` matches within a single
//! segment, everything else is literal. Patterns compile to anchored regular
//! expressions; callers that evaluate a rule repeatedly may memoize the
//! compiled [`Glob`]. A leading `./` is stripped from both pattern and path
//! before matching.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Glob compilation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum GlobError {
    /// The translated pattern failed to compile.
    #[error("glob pattern failed to compile: {0}")]
    Compile(String),
}

// ============================================================================
// SECTION: Glob
// ============================================================================

/// Compiled glob pattern.
///
/// # Invariants
/// - The underlying regex is anchored (`^…$`).
#[derive(Debug, Clone)]
pub struct Glob {
    /// Anchored regex compiled from the glob.
    regex: Regex,
}

impl Glob {
    /// Compiles a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`GlobError`] when the translated regex fails to compile.
    pub fn compile(pattern: &str) -> Result<Self, GlobError> {
        let source = translate(strip_dot_slash(pattern));
        let regex = Regex::new(&source).map_err(|err| GlobError::Compile(err.to_string()))?;
        Ok(Self {
            regex,
        })
    }

    /// Returns true when the path matches the pattern.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(strip_dot_slash(path))
    }
}

/// One-shot convenience matcher.
///
/// # Errors
///
/// Returns [`GlobError`] when the pattern fails to compile.
pub fn matches(pattern: &str, path: &str) -> Result<bool, GlobError> {
    Ok(Glob::compile(pattern)?.is_match(path))
}

/// Strips a single leading `./` from a pattern or path.
fn strip_dot_slash(value: &str) -> &str {
    value.strip_prefix("./").unwrap_or(value)
}

/// Translates a glob into an anchored regex source string.
fn translate(pattern: &str) -> String {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                source.push_str(".*");
            } else {
                source.push_str("[^/]*");
            }
        } else {
            source.push_str(&regex::escape(&ch.to_string()));
        }
    }
    source.push('$');
    source
}

// ============================================================================
// SECTION: Logical Path Normalization
// ============================================================================

/// Normalizes a path logically, without filesystem access.
///
/// Collapses repeated separators and `.` segments and resolves `..` against
/// preceding segments where possible. Used by the resource-boundary checks;
/// physical containment (symlink resolution) is an adapter concern.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
