//! # Error Types
//!
//! Construction and parsing errors for the foundational types. Higher
//! crates wrap these in their own error enums; nothing here knows about
//! the pipeline.

use thiserror::Error;

/// Rejection of a value at a validated constructor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// NIT is not 9 or 14 digits after removing spaces and dashes.
    #[error("invalid NIT {0:?}: expected 9 or 14 digits")]
    InvalidNit(String),

    /// Generation code is not a hyphenated UUID.
    #[error("invalid generation code {0:?}: expected an uppercase UUID")]
    InvalidGenerationCode(String),

    /// Control number does not match `DTE-XX-XXXXXXXX-NNNNNNNNNNNNNNN`.
    #[error("invalid control number {0:?}")]
    InvalidControlNumber(String),

    /// Business identifier was empty or blank.
    #[error("business identifier must not be empty")]
    EmptyBusinessId,

    /// Unknown document type code.
    #[error("unknown document type code {0:?}")]
    UnknownDocumentType(String),

    /// Unknown environment code or mode name.
    #[error("unknown environment {0:?}: expected 00, 01, sandbox or prod")]
    UnknownEnvironment(String),

    /// Period key is not `YYYY-MM`.
    #[error("invalid period {0:?}: expected YYYY-MM")]
    InvalidPeriod(String),

    /// Amount string could not be parsed as a decimal with two places.
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
}

/// Failure decoding a fiscal document from its JSON form.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Text was not valid JSON, or JSON did not match the document shape.
    #[error("document decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payload was JSON but not an object.
    #[error("document payload must be a JSON object, got {kind}")]
    NotAnObject {
        /// JSON kind that was received instead.
        kind: &'static str,
    },
}
