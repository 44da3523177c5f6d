//! # dte-core — Foundational Types for the DTE Stack
//!
//! Every other crate in the workspace depends on `dte-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtypes for identifiers.** [`Nit`], [`GenerationCode`],
//!    [`ControlNumber`] and [`BusinessId`] validate at construction and on
//!    deserialization.
//!
//! 2. **Integer cents for arithmetic.** Documents carry JSON numbers; sums
//!    and comparisons go through [`Amount`].
//!
//! 3. **Lossless document model.** [`Dte`] types the fields the pipeline
//!    touches and carries the rest verbatim.
//!
//! 4. **Injected time.** Emission stamps and deadlines read a [`Clock`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dte-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod catalog;
pub mod document;
pub mod error;
pub mod identity;
pub mod response;
pub mod secret;
pub mod temporal;

pub use amount::{round_half_up, Amount, MONEY_DECIMALS, QUANTITY_DECIMALS};
pub use catalog::{DocumentType, Environment, FlowType};
pub use document::{Dte, Identification, Issuer, LineItem, SignatureEnvelope, Summary, Tribute};
pub use error::{DocumentError, ValidationError};
pub use identity::{BusinessId, ControlNumber, GenerationCode, Nit};
pub use response::{AuthorityMessage, AuthorityResponse, AuthorityStatus};
pub use secret::Secret;
pub use temporal::{Clock, EmissionStamp, FixedClock, PeriodKey, SystemClock};
