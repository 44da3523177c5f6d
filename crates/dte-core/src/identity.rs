//! # Identity Newtypes
//!
//! Identifiers that flow through the DTE pipeline. Each is a distinct type:
//! a [`Nit`] cannot be passed where a [`GenerationCode`] is expected.
//!
//! ## Validation
//!
//! All identifiers validate at construction and on deserialization.
//! [`GenerationCode`] is the idempotency key for every persisted side effect
//! and is stored uppercase, the form the tax authority requires.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::DocumentType;
use crate::error::ValidationError;

/// Route deserialization through the validating constructor so that an
/// invalid identifier never enters the system from JSON.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

macro_rules! impl_display_as_str {
    ($ty:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// -- Nit ---------------------------------------------------------------------

/// Taxpayer identification number (NIT).
///
/// Accepts the printed form with dashes or spaces and stores the bare
/// digits. Valid lengths are 9 (DUI-backed) and 14 (classic NIT).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Nit(String);

impl_validating_deserialize!(Nit);
impl_display_as_str!(Nit);

impl Nit {
    /// Normalize and validate a NIT.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNit`] if the normalized value is not
    /// 9 or 14 ASCII digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let digits = Self::normalize(&raw);
        if !matches!(digits.len(), 9 | 14) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidNit(raw));
        }
        Ok(Self(digits))
    }

    /// Strip spaces and dashes without validating.
    ///
    /// Used for credential lookups where the stored key may not be a
    /// well-formed NIT.
    pub fn normalize(raw: &str) -> String {
        raw.chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect()
    }

    /// Access the bare digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// -- GenerationCode ----------------------------------------------------------

/// The document's globally unique identifier (`codigoGeneracion`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GenerationCode(String);

impl_validating_deserialize!(GenerationCode);
impl_display_as_str!(GenerationCode);

impl GenerationCode {
    /// Validate a generation code, normalizing to uppercase.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidGenerationCode`] unless the value is
    /// a 36-character hyphenated UUID.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        if raw.len() != 36 || Uuid::parse_str(&raw).is_err() {
            return Err(ValidationError::InvalidGenerationCode(raw));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// Fresh random code.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// -- ControlNumber -----------------------------------------------------------

/// Fallback establishment code when the authority assigned none.
const DEFAULT_ESTABLISHMENT: &str = "M001";
/// Fallback point-of-sale code when the authority assigned none.
const DEFAULT_POINT_OF_SALE: &str = "P001";

/// Document control number: `DTE-{type:2}-{estab:4}{pos:4}-{correlative:15}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ControlNumber(String);

impl_validating_deserialize!(ControlNumber);
impl_display_as_str!(ControlNumber);

impl ControlNumber {
    /// Validate an existing control number.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidControlNumber`] if any segment has
    /// the wrong length or alphabet.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let parts: Vec<&str> = s.split('-').collect();
        let valid = parts.len() == 4
            && parts[0] == "DTE"
            && parts[1].len() == 2
            && parts[1].chars().all(|c| c.is_ascii_digit())
            && parts[2].len() == 8
            && parts[2]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            && parts[3].len() == 15
            && parts[3].chars().all(|c| c.is_ascii_digit());
        if !valid {
            return Err(ValidationError::InvalidControlNumber(s));
        }
        Ok(Self(s))
    }

    /// Build a control number from its parts.
    ///
    /// Establishment and point-of-sale codes are right-padded with `0` and
    /// truncated to four characters; absent codes fall back to `M001` and
    /// `P001`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidControlNumber`] if the codes carry
    /// characters outside `[A-Z0-9]` or the correlative exceeds 15 digits.
    pub fn build(
        document_type: DocumentType,
        establishment: Option<&str>,
        point_of_sale: Option<&str>,
        correlative: u64,
    ) -> Result<Self, ValidationError> {
        let estab = pad_segment(establishment.unwrap_or(DEFAULT_ESTABLISHMENT));
        let pos = pad_segment(point_of_sale.unwrap_or(DEFAULT_POINT_OF_SALE));
        Self::new(format!(
            "DTE-{}-{estab}{pos}-{correlative:015}",
            document_type.code()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The correlative segment as a number.
    pub fn correlative(&self) -> u64 {
        self.0
            .rsplit('-')
            .next()
            .and_then(|c| c.parse().ok())
            .unwrap_or_default()
    }
}

fn pad_segment(code: &str) -> String {
    let mut s: String = code.chars().take(4).collect();
    while s.chars().count() < 4 {
        s.push('0');
    }
    s
}

// -- BusinessId --------------------------------------------------------------

/// Identifier of the taxpayer account a run is executed for.
///
/// Usually the business NIT, but stores may key by any opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BusinessId(String);

impl_validating_deserialize!(BusinessId);
impl_display_as_str!(BusinessId);

impl BusinessId {
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyBusinessId`] for blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyBusinessId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Nit> for BusinessId {
    fn from(nit: Nit) -> Self {
        Self(nit.0)
    }
}
