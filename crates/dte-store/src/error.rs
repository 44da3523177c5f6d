use thiserror::Error;

/// Errors from a persistence collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Backend message.
        reason: String,
    },

    /// A stored record could not be encoded or decoded.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure in a directory-backed store.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
