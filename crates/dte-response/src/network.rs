//! Descriptors for failures that never reached an authority decision.

use serde::{Deserialize, Serialize};

use crate::envelope::{CallerCategory, CallerError, CallerSeverity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkFailure {
    /// The authority did not answer in time; the document went to contingency.
    Timeout,
    /// The authority could not be reached at all.
    ConnectionError,
    /// The authority answered with a 5xx status.
    ServerError,
}

impl NetworkFailure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "MH_TIMEOUT",
            Self::ConnectionError => "MH_CONNECTION_ERROR",
            Self::ServerError => "MH_SERVER_ERROR",
        }
    }

    /// Classify a transport error code as produced by the transmitter.
    pub fn from_transport_code(code: &str) -> Option<Self> {
        if code == dte_core::response::COMMUNICATION_ERROR_CODE {
            Some(Self::ConnectionError)
        } else if code.starts_with(dte_core::response::HTTP_ERROR_PREFIX) {
            Some(Self::ServerError)
        } else {
            None
        }
    }

    pub fn to_error(&self) -> CallerError {
        let (category, user_message, detail) = match self {
            Self::Timeout => (
                CallerCategory::Network,
                "El Ministerio de Hacienda está tardando demasiado en responder. Tu documento se ha guardado de forma segura y podrás enviarlo más tarde.",
                "Timeout waiting for the authority",
            ),
            Self::ConnectionError => (
                CallerCategory::Network,
                "No se puede conectar con el Ministerio de Hacienda. Verifica tu conexión a internet o intenta más tarde.",
                "Connection failed",
            ),
            Self::ServerError => (
                CallerCategory::System,
                "El servidor del Ministerio de Hacienda tiene problemas técnicos. Tu documento está seguro y podrás reintentar.",
                "HTTP 5xx error",
            ),
        };
        CallerError {
            severity: CallerSeverity::Error,
            category,
            code: self.code().to_string(),
            user_message: user_message.to_string(),
            retryable: true,
            details: vec![detail.to_string()],
        }
    }
}
