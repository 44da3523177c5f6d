//! # Authority Response
//!
//! The result of submitting a signed document to the tax authority, in the
//! shape the pipeline consumes. The HTTP transmitter builds it from the
//! authority reply; the contingency stage synthesizes one locally.

use serde::{Deserialize, Serialize};

/// Error code used for transport failures.
pub const COMMUNICATION_ERROR_CODE: &str = "COM-ERR";

/// Prefix of error codes built from HTTP status failures (`HTTP-503`).
pub const HTTP_ERROR_PREFIX: &str = "HTTP-";

/// Processing state reported by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorityStatus {
    #[serde(rename = "PROCESADO")]
    Processed,
    #[serde(rename = "RECIBIDO_CON_OBSERVACIONES")]
    ReceivedWithObservations,
    #[serde(rename = "RECHAZADO")]
    Rejected,
    /// Locally synthesized for documents held in contingency.
    #[serde(rename = "CONTINGENCIA")]
    Contingency,
}

impl AuthorityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "PROCESADO",
            Self::ReceivedWithObservations => "RECIBIDO_CON_OBSERVACIONES",
            Self::Rejected => "RECHAZADO",
            Self::Contingency => "CONTINGENCIA",
        }
    }

    /// Parse the authority's `estado` string.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PROCESADO" => Some(Self::Processed),
            "RECIBIDO_CON_OBSERVACIONES" | "RECIBIDO" => Some(Self::ReceivedWithObservations),
            "RECHAZADO" => Some(Self::Rejected),
            "CONTINGENCIA" => Some(Self::Contingency),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthorityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One coded message from the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityMessage {
    pub code: String,
    pub description: String,
}

impl AuthorityMessage {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    /// Whether this entry reports a transport-level failure rather than an
    /// authority decision.
    pub fn is_communication_failure(&self) -> bool {
        self.code == COMMUNICATION_ERROR_CODE || self.code.starts_with(HTTP_ERROR_PREFIX)
    }
}

/// Result of one transmission attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthorityResponse {
    /// Whether the authority accepted the document.
    pub success: bool,
    /// Authority processing state, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuthorityStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_stamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AuthorityMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuthorityResponse {
    /// An acceptance with the given receipt.
    pub fn accepted(receipt_stamp: impl Into<String>, receipt_timestamp: impl Into<String>) -> Self {
        Self {
            success: true,
            status: Some(AuthorityStatus::Processed),
            receipt_stamp: Some(receipt_stamp.into()),
            receipt_timestamp: Some(receipt_timestamp.into()),
            ..Self::default()
        }
    }

    /// A rejection carrying the authority's coded messages.
    pub fn rejected(errors: Vec<AuthorityMessage>) -> Self {
        Self {
            success: false,
            status: Some(AuthorityStatus::Rejected),
            errors,
            ..Self::default()
        }
    }

    /// A transport failure with a single `COM-ERR` or `HTTP-<status>` entry.
    pub fn communication_failure(code: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            success: false,
            errors: vec![AuthorityMessage::new(code, description.clone())],
            message: Some(description),
            ..Self::default()
        }
    }

    /// Whether any error entry is a communication marker.
    pub fn is_communication_failure(&self) -> bool {
        !self.success && self.errors.iter().any(AuthorityMessage::is_communication_failure)
    }

    pub fn has_observations(&self) -> bool {
        self.status == Some(AuthorityStatus::ReceivedWithObservations)
            || !self.observations.is_empty()
    }

    /// Rejection summary: `"MH [code]: description"` entries joined by
    /// `", "`, else the message, else `"Error desconocido"`.
    pub fn rejection_summary(&self) -> String {
        if !self.errors.is_empty() {
            return self
                .errors
                .iter()
                .map(|e| format!("MH [{}]: {}", e.code, e.description))
                .collect::<Vec<_>>()
                .join(", ");
        }
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Error desconocido".to_string())
    }
}
