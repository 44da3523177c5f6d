//! # Stage Routing
//!
//! The pipeline is a finite state machine over stages. After each stage the
//! merged run status is classified into an [`Outcome`], and the pair
//! `(stage, outcome)` is looked up in [`TRANSITIONS`] to find what runs
//! next.
//!
//! ```text
//!              ┌──────────── emission ────────────┐
//! start ──▶ Validation ──▶ Signing ──▶ Transmission ──▶ ResponseRecorder ──▶ TaxKeeper ──▶ end
//!   │            │            │          │  ▲   │                                 ▲
//!   │            ▼            ▼          │  └───┘ retry (≤ 2)                     │
//!   │           end          end         ▼                                        │
//!   ├── forced contingency ──────▶ Contingency ───────────────────────────────────┤
//!   └── reception ───────────────▶ Reception ─────────────────────────────────────┘
//! ```
//!
//! A pair missing from the table is a routing error, not a fallthrough.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dte_core::FlowType;

use crate::run::RunStatus;

/// Hard cap on in-place transmission retries.
pub const MAX_TRANSMIT_RETRIES: u32 = 2;

/// Most stage visits any run can make: validation, signing, every
/// transmission attempt, then contingency or the response recorder, then
/// the tax keeper.
pub const MAX_STAGE_VISITS: usize = 2 + (MAX_TRANSMIT_RETRIES as usize + 1) + 2;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Signing,
    Transmission,
    Contingency,
    Reception,
    ResponseRecorder,
    TaxKeeper,
}

impl Stage {
    /// Step name recorded on the run state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validator",
            Self::Signing => "signer",
            Self::Transmission => "transmitter",
            Self::Contingency => "contingency",
            Self::Reception => "reception",
            Self::ResponseRecorder => "response_recorder",
            Self::TaxKeeper => "tax_keeper",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage visit amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The stage succeeded; move forward.
    Advanced,
    /// Transient failure below the retry cap; run the stage again.
    Retry,
    /// Retries exhausted; fall back to contingency.
    Escalated,
    /// The run ends failed.
    Failed,
}

/// Where a run goes after a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Next {
    Stage(Stage),
    End,
}

/// The complete routing table.
pub const TRANSITIONS: &[(Stage, Outcome, Next)] = &[
    (Stage::Validation, Outcome::Advanced, Next::Stage(Stage::Signing)),
    (Stage::Validation, Outcome::Failed, Next::End),
    (Stage::Signing, Outcome::Advanced, Next::Stage(Stage::Transmission)),
    (Stage::Signing, Outcome::Failed, Next::End),
    (Stage::Transmission, Outcome::Advanced, Next::Stage(Stage::ResponseRecorder)),
    (Stage::Transmission, Outcome::Retry, Next::Stage(Stage::Transmission)),
    (Stage::Transmission, Outcome::Escalated, Next::Stage(Stage::Contingency)),
    (Stage::Transmission, Outcome::Failed, Next::End),
    (Stage::Contingency, Outcome::Advanced, Next::Stage(Stage::TaxKeeper)),
    (Stage::Contingency, Outcome::Failed, Next::End),
    (Stage::Reception, Outcome::Advanced, Next::Stage(Stage::TaxKeeper)),
    (Stage::Reception, Outcome::Failed, Next::End),
    (Stage::ResponseRecorder, Outcome::Advanced, Next::Stage(Stage::TaxKeeper)),
    (Stage::TaxKeeper, Outcome::Advanced, Next::End),
];

/// Errors raised while routing or merging run state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// A patch moved the status backwards or sideways.
    #[error("invalid status change {from} -> {to}")]
    InvalidStatusChange {
        /// Status before the patch.
        from: RunStatus,
        /// Status the patch requested.
        to: RunStatus,
    },

    /// A patch pushed the retry counter over the cap or backwards.
    #[error("retry counter {attempted} outside 0..={limit} (was {current})")]
    RetryCounter {
        /// Counter before the patch.
        current: u32,
        /// Counter the patch requested.
        attempted: u32,
        /// The cap.
        limit: u32,
    },

    /// A patch tried to replace an assigned generation code.
    #[error("generation code is immutable: {assigned} cannot become {attempted}")]
    GenerationCodeChanged {
        /// Code already on the run.
        assigned: String,
        /// Code the patch carried.
        attempted: String,
    },

    /// A stage left the run in a status it cannot produce.
    #[error("stage {stage} cannot leave the run in status {status}")]
    UnexpectedStatus {
        /// The stage that just ran.
        stage: Stage,
        /// The merged status.
        status: RunStatus,
    },

    /// No table entry for the pair.
    #[error("no route from stage {stage} on outcome {outcome:?}")]
    NoRoute {
        /// The stage that just ran.
        stage: Stage,
        /// Its classified outcome.
        outcome: Outcome,
    },

    /// The run made more stage visits than any legal path allows.
    #[error("stage visit limit {limit} exceeded")]
    VisitLimitExceeded {
        /// The limit.
        limit: usize,
    },
}

/// First stage of a run.
pub fn entry(flow: FlowType, status: RunStatus) -> Stage {
    match (flow, status) {
        (FlowType::Reception, _) => Stage::Reception,
        (FlowType::Emission, RunStatus::Contingency) => Stage::Contingency,
        (FlowType::Emission, _) => Stage::Validation,
    }
}

/// Classify the merged status after `stage` ran.
pub fn classify(stage: Stage, status: RunStatus) -> Result<Outcome, TransitionError> {
    let outcome = match (stage, status) {
        (_, RunStatus::Failed) => Some(Outcome::Failed),
        (Stage::Validation, RunStatus::Signing) => Some(Outcome::Advanced),
        (Stage::Signing, RunStatus::Transmitting) => Some(Outcome::Advanced),
        (Stage::Transmission, RunStatus::Completed) => Some(Outcome::Advanced),
        (Stage::Transmission, RunStatus::Transmitting) => Some(Outcome::Retry),
        (Stage::Transmission, RunStatus::Contingency) => Some(Outcome::Escalated),
        (
            Stage::Contingency | Stage::Reception | Stage::ResponseRecorder | Stage::TaxKeeper,
            RunStatus::Completed,
        ) => Some(Outcome::Advanced),
        _ => None,
    };
    outcome.ok_or(TransitionError::UnexpectedStatus { stage, status })
}

/// Look up the next stage.
pub fn route(stage: Stage, outcome: Outcome) -> Result<Next, TransitionError> {
    TRANSITIONS
        .iter()
        .find(|(s, o, _)| *s == stage && *o == outcome)
        .map(|(_, _, next)| *next)
        .ok_or(TransitionError::NoRoute { stage, outcome })
}
