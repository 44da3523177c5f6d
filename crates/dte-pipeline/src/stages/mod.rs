//! One module per pipeline stage. Each takes the run state read-only and
//! returns the patch the orchestrator merges.

pub mod contingency;
pub mod reception;
pub mod recorder;
pub mod signing;
pub mod tax;
pub mod transmission;
pub mod validation;
