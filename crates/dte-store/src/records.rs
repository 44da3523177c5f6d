//! Persisted record shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dte_core::{
    AuthorityResponse, BusinessId, ControlNumber, DocumentType, Dte, Environment, GenerationCode,
    Secret, SignatureEnvelope,
};

/// Signing credentials for one business in one environment.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub business_id: BusinessId,
    pub environment: Environment,
    /// Certificate password; absent when the caller must supply it.
    pub password: Option<Secret>,
    /// Bearer token for the signing service.
    pub api_token: Option<Secret>,
    /// Whether the business's license to emit is active.
    pub active: bool,
}

/// Lifecycle state of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Accepted by the authority.
    Processed,
    /// Signed offline, awaiting deferred transmission.
    Contingency,
}

/// Which side of the transaction the business is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentClass {
    Issued,
    Received,
}

/// A document as persisted after transmission or contingency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub generation_code: GenerationCode,
    pub business_id: Option<BusinessId>,
    pub environment: Environment,
    pub document_type: DocumentType,
    pub control_number: ControlNumber,
    pub state: DocumentState,
    pub class: DocumentClass,
    /// The authoritative document.
    pub document: Dte,
    pub signature: Option<SignatureEnvelope>,
    /// SHA-256 of the signature envelope, lowercase hex.
    pub signature_digest: Option<String>,
    pub authority_response: Option<AuthorityResponse>,
    pub receipt_stamp: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    /// The normal-operation attempt a contingency variant replaced. Kept
    /// for audit only.
    pub original_attempt: Option<Dte>,
    pub updated_at: DateTime<Utc>,
}

/// The fiscal response record for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub generation_code: GenerationCode,
    pub business_id: Option<BusinessId>,
    pub response: AuthorityResponse,
    pub recorded_at: DateTime<Utc>,
}
