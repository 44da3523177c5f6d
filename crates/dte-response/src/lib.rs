//! # dte-response — Error Taxonomy & Response Mapper
//!
//! Translates what the pipeline produced into what a caller can act on:
//!
//! - [`catalog`]: authority message codes to [`ErrorDescriptor`]s.
//! - [`process`]: a whole [`AuthorityResponse`](dte_core::AuthorityResponse)
//!   split into errors, warnings and observations.
//! - [`network`]: descriptors for failures with no authority decision.
//! - [`envelope`]: the caller-facing [`ProcessResponse`] built from a
//!   finished run.
//!
//! Nothing here performs I/O.

pub mod catalog;
pub mod envelope;
pub mod network;
pub mod process;

pub use catalog::{map_authority_code, Category, ErrorDescriptor, Severity};
pub use envelope::{
    CallerCategory, CallerError, CallerSeverity, DocumentLinks, ProcessResponse, ResponseData,
};
pub use network::NetworkFailure;
pub use process::{process_authority_response, ProcessedResponse};
