// crates/archon-core/src/core/hashing.rs
// ============================================================================
// Module: Archon Canonical Hashing
// Description: Canonical JSON serialization and SHA-256 digests.
// Purpose: Provide the single hashing path shared by rules, snapshots, and logs.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! All Archon hashes (`ir_hash`, `RS_hash`, `input_hash`) are SHA-256 over
//! one canonical JSON serialization: object keys sorted at every level,
//! ECMA-standard string escaping, no whitespace. The canonicalizer is RFC
//! 8785 (`serde_jcs`); this module is the only place that serializes for
//! hashing, so the rule compiler, snapshot builder, and input hasher cannot
//! drift apart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Algorithms and Digests
// ============================================================================

/// Hash algorithms supported by Archon.
///
/// # Invariants
/// - Variants are stable for serialization and audit-record matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// Default algorithm for all canonical hashes.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Hash digest with its algorithm and lowercase hex value.
///
/// # Invariants
/// - `value` is lowercase hexadecimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced the digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest value.
    pub value: String,
}

impl HashDigest {
    /// Creates a digest from raw bytes, rendering lowercase hex.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        let mut value = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            value.push_str(&format!("{byte:02x}"));
        }
        Self {
            algorithm,
            value,
        }
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by canonicalization and hashing.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HashError {
    /// Canonical JSON serialization failed.
    #[error("canonical json serialization failed: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Operations
// ============================================================================

/// Serializes a value to canonical JSON bytes (RFC 8785).
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value cannot be
/// represented in canonical JSON (for example non-finite floats).
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes raw bytes with the given algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let digest = Sha256::digest(bytes);
            HashDigest::new(algorithm, &digest)
        }
    }
}

/// Hashes the canonical JSON serialization of a value.
///
/// # Errors
///
/// Returns [`HashError`] when canonicalization fails.
pub fn hash_canonical_json<T: Serialize>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions may unwrap.")]

    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_bytes_sort_keys_without_whitespace() {
        let value = json!({"b": 2, "a": {"d": 4, "c": 3}});
        let bytes = canonical_json_bytes(&value).unwrap();
        assert_eq!(bytes, br#"{"a":{"c":3,"d":4},"b":2}"#);
    }

    #[test]
    fn hash_is_order_independent_for_maps() {
        let left = json!({"a": 1, "b": 2});
        let right = json!({"b": 2, "a": 1});
        let hash_left = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &left).unwrap();
        let hash_right = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &right).unwrap();
        assert_eq!(hash_left, hash_right);
    }

    #[test]
    fn golden_hash_empty_object() {
        // SHA-256 of "{}".
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &json!({})).unwrap();
        assert_eq!(
            digest.value,
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let digest = HashDigest::new(HashAlgorithm::Sha256, &[0xAB, 0xCD, 0xEF, 0x12]);
        assert_eq!(digest.value, "abcdef12");
    }
}
