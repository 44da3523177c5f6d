//! # dte-state — Run State and Routing
//!
//! The data the orchestrator threads through the pipeline and the rules
//! for moving it forward.
//!
//! - [`run`]: the run record, its status lifecycle and the typed patches
//!   stages return.
//! - [`code`]: stage error codes with their retryable flag and class.
//! - [`transition`]: the `(stage, outcome) → next stage` table.
//!
//! Nothing here performs I/O.

pub mod code;
pub mod run;
pub mod transition;

pub use code::{ErrorClass, ErrorCode};
pub use run::{
    RawPayload, RunError, RunOutcome, RunRequest, RunState, RunStatus, SigningMaterial,
    StatePatch,
};
pub use transition::{
    classify, entry, route, Next, Outcome, Stage, TransitionError, MAX_STAGE_VISITS,
    MAX_TRANSMIT_RETRIES, TRANSITIONS,
};
