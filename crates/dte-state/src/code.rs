//! # Stage Error Codes
//!
//! Every failed run carries one of these codes. The code fixes the
//! default retryable flag and the error class the caller sees.

use serde::{Deserialize, Serialize};

/// Broad failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Missing or inactive credentials, missing password.
    Configuration,
    /// Signing service or authority unreachable.
    Transient,
    /// The document or the authority's judgement of it.
    CallerData,
    /// Unexpected failure inside a stage.
    System,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Transient => "transient",
            Self::CallerData => "caller_data",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "VALIDATION_ERROR_NO_DTE")]
    ValidationNoDte,
    #[serde(rename = "VALIDATION_ERROR_FIELDS")]
    ValidationFields,
    #[serde(rename = "VALIDATION_ERROR_SYSTEM")]
    ValidationSystem,
    #[serde(rename = "SIGN_ERROR_NO_DTE")]
    SignNoDte,
    #[serde(rename = "SIGN_ERROR_NO_CREDENTIALS")]
    SignNoCredentials,
    #[serde(rename = "SIGN_ERROR_INACTIVE_LICENSE")]
    SignInactiveLicense,
    #[serde(rename = "SIGN_ERROR_NO_PASSWORD")]
    SignNoPassword,
    #[serde(rename = "SIGN_ERROR_SERVICE")]
    SignService,
    #[serde(rename = "TRANSMIT_ERROR_NO_SIGNATURE")]
    TransmitNoSignature,
    #[serde(rename = "TRANSMIT_ERROR_COMMUNICATION")]
    TransmitCommunication,
    #[serde(rename = "TRANSMIT_ERROR_MH_VALIDATION")]
    TransmitMhValidation,
    #[serde(rename = "TRANSMIT_ERROR_SYSTEM")]
    TransmitSystem,
    #[serde(rename = "CONTINGENCY_ERROR_PRECONDITION")]
    ContingencyPrecondition,
    #[serde(rename = "CONTINGENCY_ERROR")]
    Contingency,
    #[serde(rename = "RECEPTION_ERROR_PARSE")]
    ReceptionParse,
    #[serde(rename = "RECEPTION_ERROR_NO_DTE")]
    ReceptionNoDte,
    /// The run broke the routing rules; see `TransitionError`.
    #[serde(rename = "ORCHESTRATION_ERROR")]
    Orchestration,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationNoDte => "VALIDATION_ERROR_NO_DTE",
            Self::ValidationFields => "VALIDATION_ERROR_FIELDS",
            Self::ValidationSystem => "VALIDATION_ERROR_SYSTEM",
            Self::SignNoDte => "SIGN_ERROR_NO_DTE",
            Self::SignNoCredentials => "SIGN_ERROR_NO_CREDENTIALS",
            Self::SignInactiveLicense => "SIGN_ERROR_INACTIVE_LICENSE",
            Self::SignNoPassword => "SIGN_ERROR_NO_PASSWORD",
            Self::SignService => "SIGN_ERROR_SERVICE",
            Self::TransmitNoSignature => "TRANSMIT_ERROR_NO_SIGNATURE",
            Self::TransmitCommunication => "TRANSMIT_ERROR_COMMUNICATION",
            Self::TransmitMhValidation => "TRANSMIT_ERROR_MH_VALIDATION",
            Self::TransmitSystem => "TRANSMIT_ERROR_SYSTEM",
            Self::ContingencyPrecondition => "CONTINGENCY_ERROR_PRECONDITION",
            Self::Contingency => "CONTINGENCY_ERROR",
            Self::ReceptionParse => "RECEPTION_ERROR_PARSE",
            Self::ReceptionNoDte => "RECEPTION_ERROR_NO_DTE",
            Self::Orchestration => "ORCHESTRATION_ERROR",
        }
    }

    /// Whether a caller may resubmit the same request.
    pub fn retryable(&self) -> bool {
        match self {
            Self::ValidationFields
            | Self::ValidationSystem
            | Self::SignService
            | Self::TransmitNoSignature
            | Self::TransmitCommunication
            | Self::TransmitSystem
            | Self::Contingency
            | Self::Orchestration => true,
            Self::ValidationNoDte
            | Self::SignNoDte
            | Self::SignNoCredentials
            | Self::SignInactiveLicense
            | Self::SignNoPassword
            | Self::TransmitMhValidation
            | Self::ContingencyPrecondition
            | Self::ReceptionParse
            | Self::ReceptionNoDte => false,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::SignNoCredentials
            | Self::SignInactiveLicense
            | Self::SignNoPassword
            | Self::ContingencyPrecondition => ErrorClass::Configuration,
            Self::SignService | Self::TransmitCommunication => ErrorClass::Transient,
            Self::ValidationNoDte
            | Self::ValidationFields
            | Self::SignNoDte
            | Self::TransmitMhValidation
            | Self::ReceptionParse
            | Self::ReceptionNoDte => ErrorClass::CallerData,
            Self::ValidationSystem
            | Self::TransmitNoSignature
            | Self::TransmitSystem
            | Self::Contingency
            | Self::Orchestration => ErrorClass::System,
        }
    }

    pub fn all() -> &'static [ErrorCode] {
        &[
            Self::ValidationNoDte,
            Self::ValidationFields,
            Self::ValidationSystem,
            Self::SignNoDte,
            Self::SignNoCredentials,
            Self::SignInactiveLicense,
            Self::SignNoPassword,
            Self::SignService,
            Self::TransmitNoSignature,
            Self::TransmitCommunication,
            Self::TransmitMhValidation,
            Self::TransmitSystem,
            Self::ContingencyPrecondition,
            Self::Contingency,
            Self::ReceptionParse,
            Self::ReceptionNoDte,
            Self::Orchestration,
        ]
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == value)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
