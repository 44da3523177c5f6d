//! # dte-pipeline — Document-Processing Orchestrator
//!
//! Sequences validation, signing, transmission, offline contingency and
//! fiscal bookkeeping for one document at a time.
//!
//! ```text
//! RunRequest ─▶ Orchestrator::run ─▶ stage ─▶ StatePatch ─▶ RunState::apply
//!                                     ▲                           │
//!                                     └──── route(stage, outcome) ◀┘
//! ```
//!
//! Stages live in [`stages`]; each is a function from the current
//! [`RunState`](dte_state::RunState) to a
//! [`StatePatch`](dte_state::StatePatch). Collaborators (signing
//! service, authority, stores, clock) are injected through
//! [`Collaborators`], and every call to them is bounded by
//! [`PipelineConfig::call_timeout`].
//!
//! Runs share no state beyond the [`PipelineMetrics`] counters.

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod stages;

pub use config::PipelineConfig;
pub use context::{Collaborators, StageContext};
pub use error::PipelineError;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use orchestrator::Orchestrator;
