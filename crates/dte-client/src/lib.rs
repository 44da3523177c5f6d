//! # dte-client — External Collaborators
//!
//! Typed clients for the two services the pipeline calls:
//!
//! - **Signing service** ([`Signer`]): turns a cleaned document into a
//!   compact JWS using the taxpayer's stored certificate.
//! - **Authority reception** ([`Transmitter`]): submits the JWS and reports
//!   acceptance, rejection or a communication failure.
//!
//! Each has an HTTP implementation built from [`config`] and a scripted
//! mock for tests. The pipeline holds them as trait objects.

pub mod config;
pub mod error;
pub mod retry;
pub mod signer;
pub mod transmitter;

pub use config::{ConfigError, SigningConfig, TransmissionConfig};
pub use error::ClientError;
pub use retry::{wake, WakePolicy};
pub use signer::{HttpSigner, MockSigner, SignCall, SignRequest, Signer};
pub use transmitter::{HttpTransmitter, MockReply, MockTransmitter, Submission, Transmitter};
