//! # Schema Conformance
//!
//! Validates a raw document against the embedded JSON Schema (Draft
//! 2020-12). The schema is compiled once at construction; validation
//! collects every violation rather than stopping at the first.
//!
//! Sales-shaped documents (types 01, 03, 05, 06) are additionally checked
//! for line-item and summary structure; other types only for the
//! identification and issuer blocks.

use serde_json::Value;
use thiserror::Error;

/// The embedded document schema.
pub const DOCUMENT_SCHEMA: &str = include_str!("../schemas/dte.schema.json");

/// A single violation, rendered as `"<field>: <description>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Sequential code, `SCHEMA-0001` or `RULE-0001`.
    pub code: String,
    /// Dotted path to the offending field; `documento` for the root.
    pub field: String,
    /// Human-readable description.
    pub description: String,
}

impl FieldViolation {
    pub fn new(code: impl Into<String>, field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            field: field.into(),
            description: description.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.description)
    }
}

/// Errors building a schema validator.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Schema text is not JSON.
    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    /// Schema is JSON but not a valid Draft 2020-12 schema.
    #[error("failed to compile schema: {reason}")]
    Compile {
        /// Compiler message.
        reason: String,
    },
}

/// Convert a JSON Pointer (`/resumen/tributos/0/valor`) to a dotted path.
pub fn pointer_to_field(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        "documento".to_string()
    } else {
        trimmed.replace('/', ".")
    }
}

/// Compiled document schema.
pub struct DocumentSchema {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for DocumentSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSchema").finish_non_exhaustive()
    }
}

impl DocumentSchema {
    /// Compile the embedded schema.
    pub fn embedded() -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(DOCUMENT_SCHEMA)?;
        Self::from_value(&schema)
    }

    /// Compile an arbitrary schema value.
    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(schema)
            .map_err(|e| SchemaError::Compile {
                reason: e.to_string(),
            })?;
        Ok(Self { validator })
    }

    /// Every violation of `value`, in schema evaluation order.
    pub fn violations(&self, value: &Value) -> Vec<FieldViolation> {
        self.validator
            .iter_errors(value)
            .enumerate()
            .map(|(idx, err)| {
                FieldViolation::new(
                    format!("SCHEMA-{:04}", idx + 1),
                    pointer_to_field(&err.instance_path.to_string()),
                    err.to_string(),
                )
            })
            .collect()
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }
}
