//! Collaborator client error types.

use std::time::Duration;

/// Errors from the signing service or the authority endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The service returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
    /// The signing service answered but refused to sign.
    #[error("signing refused: {reason}")]
    SigningRefused { reason: String },
    /// The call did not finish in time.
    #[error("{endpoint} timed out after {after:?}")]
    Timeout { endpoint: String, after: Duration },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
