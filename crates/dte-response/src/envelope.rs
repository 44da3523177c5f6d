//! # Caller Envelope
//!
//! The `{success, data?, error?}` shape returned to whoever submitted the
//! document, derived from a finished [`RunState`]. Field names on the
//! wire follow the caller contract (`codigoGeneracion`, `canRetry`, ...).
//!
//! ## Mapping
//!
//! | run ends as | success | error |
//! |---|---|---|
//! | accepted | yes | none |
//! | accepted with observations | yes | warning `MH_RECEIVED_WITH_OBSERVATIONS` |
//! | received document recorded | yes | none |
//! | held in contingency | no | network `MH_TIMEOUT` |
//! | rejected by the authority | no | first mapped error |
//! | failed in a stage | no | system, run error code |
//! | anything else | no | `UNKNOWN_ERROR` |

use serde::{Deserialize, Serialize};

use dte_core::{AuthorityResponse, FlowType};
use dte_state::{ErrorCode, RunState, RunStatus};

use crate::catalog::{self, Category, ErrorDescriptor, OBSERVATIONS_CODE};
use crate::network::NetworkFailure;
use crate::process::process_authority_response;

/// Error categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerCategory {
    Auth,
    Data,
    Math,
    Contingency,
    Network,
    System,
}

impl From<Category> for CallerCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Auth => Self::Auth,
            Category::Data | Category::Warning => Self::Data,
            Category::Date | Category::Calculation => Self::Math,
            Category::Contingency => Self::Contingency,
            Category::Technical => Self::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerSeverity {
    Error,
    Warning,
}

/// Structured error for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerError {
    pub severity: CallerSeverity,
    pub category: CallerCategory,
    pub code: String,
    pub user_message: String,
    /// Whether the caller should offer a retry.
    #[serde(rename = "canRetry")]
    pub retryable: bool,
    /// Raw messages for support.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl CallerError {
    fn from_descriptor(descriptor: &ErrorDescriptor, retryable: bool) -> Self {
        Self {
            severity: CallerSeverity::Error,
            category: descriptor.category.into(),
            code: descriptor.code.clone(),
            user_message: descriptor.user_message.clone(),
            retryable,
            details: vec![descriptor.message.clone()],
        }
    }
}

/// Download links for the rendered document, when a renderer produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(rename = "codigoGeneracion")]
    pub generation_code: Option<String>,
    #[serde(rename = "selloRecepcion", default, skip_serializing_if = "Option::is_none")]
    pub receipt_stamp: Option<String>,
    #[serde(
        rename = "fechaHoraRecepcion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub receipt_timestamp: Option<String>,
    #[serde(flatten)]
    pub links: DocumentLinks,
}

/// What the caller receives for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallerError>,
}

impl ProcessResponse {
    pub fn from_run(state: &RunState) -> Self {
        let data = || ResponseData {
            generation_code: state.generation_code().map(ToString::to_string),
            receipt_stamp: state
                .authority_response
                .as_ref()
                .and_then(|r| r.receipt_stamp.clone()),
            receipt_timestamp: state
                .authority_response
                .as_ref()
                .and_then(|r| r.receipt_timestamp.clone()),
            links: DocumentLinks::default(),
        };

        let held_offline = (state.status == RunStatus::Completed && state.is_offline)
            || state.status == RunStatus::Contingency;
        if held_offline {
            let mut error = NetworkFailure::Timeout.to_error();
            if let Some(reason) = &state.contingency_reason {
                error.user_message = reason.clone();
            }
            return Self::failure(error);
        }

        match (state.status, state.authority_response.as_ref()) {
            (RunStatus::Completed, Some(response)) if response.success => Self {
                success: true,
                data: Some(data()),
                error: observation_warning(response),
            },
            (RunStatus::Completed, None) if state.flow == FlowType::Reception => Self {
                success: true,
                data: Some(data()),
                error: None,
            },
            (RunStatus::Failed, Some(response)) if is_rejection(state, response) => {
                let processed = process_authority_response(response);
                match processed.primary_error() {
                    Some(primary) => Self::failure(CallerError::from_descriptor(
                        primary,
                        state.retryable && primary.retryable,
                    )),
                    None => Self::system_failure(state),
                }
            }
            (RunStatus::Failed, _) => Self::system_failure(state),
            (status, _) => Self::failure(CallerError {
                severity: CallerSeverity::Error,
                category: CallerCategory::System,
                code: "UNKNOWN_ERROR".to_string(),
                user_message: "Error desconocido. Por favor intenta nuevamente.".to_string(),
                retryable: true,
                details: vec![format!("Status: {status}")],
            }),
        }
    }

    /// Attach rendered-document links to a successful response.
    pub fn with_links(mut self, links: DocumentLinks) -> Self {
        if let Some(data) = self.data.as_mut() {
            data.links = links;
        }
        self
    }

    fn failure(error: CallerError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    fn system_failure(state: &RunState) -> Self {
        let (code, message) = match &state.error {
            Some(e) => (e.code.as_str().to_string(), e.message.clone()),
            None => (
                "SYSTEM_ERROR".to_string(),
                "Error interno del sistema".to_string(),
            ),
        };
        Self::failure(CallerError {
            severity: CallerSeverity::Error,
            category: CallerCategory::System,
            code,
            user_message: message,
            retryable: state.retryable,
            details: state.validation_errors.clone(),
        })
    }
}

/// Whether the run failed because the authority refused the document. A
/// response left over from an earlier communication failure does not
/// count.
fn is_rejection(state: &RunState, response: &AuthorityResponse) -> bool {
    !response.errors.is_empty()
        && state.error.as_ref().map(|e| e.code) == Some(ErrorCode::TransmitMhValidation)
}

fn observation_warning(response: &AuthorityResponse) -> Option<CallerError> {
    if !response.has_observations() {
        return None;
    }
    let descriptor = catalog::map_authority_code("002");
    Some(CallerError {
        severity: CallerSeverity::Warning,
        category: CallerCategory::Data,
        code: OBSERVATIONS_CODE.to_string(),
        user_message: descriptor.user_message,
        retryable: false,
        details: response.observations.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_normalize() {
        assert_eq!(CallerCategory::from(Category::Date), CallerCategory::Math);
        assert_eq!(CallerCategory::from(Category::Calculation), CallerCategory::Math);
        assert_eq!(CallerCategory::from(Category::Technical), CallerCategory::System);
        assert_eq!(CallerCategory::from(Category::Warning), CallerCategory::Data);
        assert_eq!(CallerCategory::from(Category::Auth), CallerCategory::Auth);
        assert_eq!(
            CallerCategory::from(Category::Contingency),
            CallerCategory::Contingency
        );
    }

    #[test]
    fn draft_run_is_unknown() {
        let r = ProcessResponse::from_run(&RunState::default());
        assert!(!r.success);
        let e = r.error.unwrap();
        assert_eq!(e.code, "UNKNOWN_ERROR");
        assert!(e.retryable);
        assert_eq!(e.details, vec!["Status: draft".to_string()]);
    }

    #[test]
    fn caller_error_serializes_with_contract_names() {
        let e = NetworkFailure::Timeout.to_error();
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["canRetry"], true);
        assert_eq!(v["category"], "network");
        assert!(v.get("userMessage").is_some());
    }
}
