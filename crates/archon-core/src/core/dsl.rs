// crates/archon-core/src/core/dsl.rs
// ============================================================================
// Module: Restriction DSL Parser
// Description: Minimal, author-facing text form for restriction rules.
// Purpose: Turn operator-authored rule text into `CompiledDrr` with
//          validation at compile time, never at evaluation.
// Dependencies: crate::core::{restriction, taxonomy}, thiserror
// ============================================================================

//! ## Overview
//!
//! The DSL is deliberately small: one rule per source, an effect, a
//! capability kind, and a conjunction of glob conditions.
//!
//! ### Grammar (informal)
//! ```text
//! rule      := ("allow" | "deny") kind "where" condition ("and" condition)*
//! condition := field "matches" quoted-glob
//! field     := "capability.params." key
//! ```
//!
//! ### Example
//!
//! ```
//! use archon_core::RuleId;
//! use archon_core::dsl::compile_dsl;
//!
//! let rule = compile_dsl(
//!     RuleId::new("docs-ro"),
//!     r#"allow fs.read where capability.params.path matches "./docs/**""#,
//! )
//! .unwrap();
//! assert_eq!(rule.conditions.len(), 1);
//! ```
//!
//! Semantically equivalent text and structured inputs compile to the same
//! `ir_hash`; invalid source fails here and never reaches the evaluator.
//! DSL input is untrusted; size limits are enforced before tokenization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::RuleId;
use crate::core::restriction::CompiledDrr;
use crate::core::restriction::Condition;
use crate::core::restriction::ConditionOp;
use crate::core::restriction::DrrEffect;
use crate::core::restriction::PARAM_FIELD_PREFIX;
use crate::core::restriction::RestrictionError;
use crate::core::restriction::compile_structured;
use crate::core::taxonomy::CapabilityKind;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum allowed DSL input size in bytes.
const MAX_DSL_INPUT_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that can occur while compiling rule text.
///
/// # Invariants
/// - Variants are stable for programmatic handling; positions are byte
///   offsets into the original input.
#[derive(Debug, Error)]
pub enum DslError {
    /// Input was empty or contained only whitespace.
    #[error("rule text is empty")]
    EmptyInput,
    /// Input exceeded the configured size limit.
    #[error("rule text exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual input length in bytes.
        actual_bytes: usize,
    },
    /// Unexpected token encountered during parsing.
    #[error("syntax error at byte {position}: expected {expected}, found {found}")]
    Syntax {
        /// Human-friendly expectation summary.
        expected: &'static str,
        /// The token that was actually seen.
        found: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Capability kind is outside the closed taxonomy.
    #[error("unknown capability kind {raw} at byte {position}")]
    UnknownCapabilityKind {
        /// The rejected kind text.
        raw: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Rule carried no conditions.
    #[error("rule has no conditions")]
    EmptyConditions,
    /// Condition field is outside the v1 grammar.
    #[error("unknown field {field} at byte {position}")]
    UnknownField {
        /// Rejected field selector.
        field: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Condition operator is outside the closed set.
    #[error("unknown operator {raw} at byte {position}")]
    UnknownOperator {
        /// Rejected operator text.
        raw: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Structured compilation failed after parsing.
    #[error(transparent)]
    Compile(RestrictionError),
}

// ============================================================================
// SECTION: Tokenizer
// ============================================================================

/// Token with its byte position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    /// Token text; quoted strings are unquoted.
    text: String,
    /// Byte offset of the token start.
    position: usize,
    /// True when the token was written as a quoted string.
    quoted: bool,
}

/// Splits source text into whitespace-separated words and quoted strings.
fn tokenize(source: &str) -> Result<Vec<Token>, DslError> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        let ch = bytes[index];
        if ch.is_ascii_whitespace() {
            index += 1;
            continue;
        }
        if ch == b'"' {
            let start = index;
            index += 1;
            let mut text = String::new();
            loop {
                if index >= bytes.len() {
                    return Err(DslError::Syntax {
                        expected: "closing quote",
                        found: "end of input".to_string(),
                        position: start,
                    });
                }
                if bytes[index] == b'"' {
                    index += 1;
                    break;
                }
                // Source is valid UTF-8; walk one scalar at a time.
                let rest = &source[index ..];
                let Some(scalar) = rest.chars().next() else {
                    return Err(DslError::Syntax {
                        expected: "closing quote",
                        found: "end of input".to_string(),
                        position: start,
                    });
                };
                text.push(scalar);
                index += scalar.len_utf8();
            }
            tokens.push(Token {
                text,
                position: start,
                quoted: true,
            });
            continue;
        }
        let start = index;
        while index < bytes.len() && !bytes[index].is_ascii_whitespace() && bytes[index] != b'"' {
            index += 1;
        }
        tokens.push(Token {
            text: source[start .. index].to_string(),
            position: start,
            quoted: false,
        });
    }
    Ok(tokens)
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Cursor over the token stream.
struct Cursor {
    /// Tokens in source order.
    tokens: Vec<Token>,
    /// Next token index.
    index: usize,
    /// Total source length, for end-of-input positions.
    source_len: usize,
}

impl Cursor {
    /// Takes the next token or fails with the expectation summary.
    fn next(&mut self, expected: &'static str) -> Result<Token, DslError> {
        let token = self.tokens.get(self.index).cloned().ok_or_else(|| DslError::Syntax {
            expected,
            found: "end of input".to_string(),
            position: self.source_len,
        })?;
        self.index += 1;
        Ok(token)
    }

    /// Returns true when all tokens are consumed.
    const fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }
}

/// Parses one condition: `field matches "<glob>"`.
fn parse_condition(cursor: &mut Cursor) -> Result<Condition, DslError> {
    let field = cursor.next("condition field")?;
    if field.quoted || !field.text.starts_with(PARAM_FIELD_PREFIX)
        || field.text.len() == PARAM_FIELD_PREFIX.len()
    {
        return Err(DslError::UnknownField {
            field: field.text,
            position: field.position,
        });
    }
    let op = cursor.next("operator")?;
    if op.quoted || op.text != "matches" {
        return Err(DslError::UnknownOperator {
            raw: op.text,
            position: op.position,
        });
    }
    let value = cursor.next("quoted glob pattern")?;
    if !value.quoted {
        return Err(DslError::Syntax {
            expected: "quoted glob pattern",
            found: value.text,
            position: value.position,
        });
    }
    Ok(Condition {
        field: field.text,
        op: ConditionOp::Matches,
        value: value.text,
    })
}

/// Compiles rule text into canonical form.
///
/// # Errors
///
/// Returns [`DslError`] for malformed text, unknown kinds, fields, or
/// operators, and empty condition lists. Compilation failures never defer to
/// evaluation time.
pub fn compile_dsl(id: RuleId, source: &str) -> Result<CompiledDrr, DslError> {
    if source.len() > MAX_DSL_INPUT_BYTES {
        return Err(DslError::InputTooLarge {
            max_bytes: MAX_DSL_INPUT_BYTES,
            actual_bytes: source.len(),
        });
    }
    if source.trim().is_empty() {
        return Err(DslError::EmptyInput);
    }
    let mut cursor = Cursor {
        tokens: tokenize(source)?,
        index: 0,
        source_len: source.len(),
    };

    let effect_token = cursor.next("allow or deny")?;
    let effect = match effect_token.text.as_str() {
        "allow" if !effect_token.quoted => DrrEffect::Allow,
        "deny" if !effect_token.quoted => DrrEffect::Deny,
        _ => {
            return Err(DslError::Syntax {
                expected: "allow or deny",
                found: effect_token.text,
                position: effect_token.position,
            });
        }
    };

    let kind_token = cursor.next("capability kind")?;
    let kind: CapabilityKind =
        kind_token.text.parse().map_err(|_| DslError::UnknownCapabilityKind {
            raw: kind_token.text.clone(),
            position: kind_token.position,
        })?;

    let where_token = cursor.next("where")?;
    if where_token.quoted || where_token.text != "where" {
        return Err(DslError::Syntax {
            expected: "where",
            found: where_token.text,
            position: where_token.position,
        });
    }

    let mut conditions = vec![parse_condition(&mut cursor)?];
    while !cursor.at_end() {
        let and_token = cursor.next("and")?;
        if and_token.quoted || and_token.text != "and" {
            return Err(DslError::Syntax {
                expected: "and",
                found: and_token.text,
                position: and_token.position,
            });
        }
        conditions.push(parse_condition(&mut cursor)?);
    }

    compile_structured(id, kind, effect, conditions).map_err(|err| match err {
        RestrictionError::EmptyConditions {
            ..
        } => DslError::EmptyConditions,
        other => DslError::Compile(other),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
