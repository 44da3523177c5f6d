//! Errors raised while assembling an orchestrator. Runs themselves never
//! fail with `Err`: every failure ends up on the run state.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The embedded document schema did not compile.
    #[error("document schema: {0}")]
    Schema(#[from] dte_schema::SchemaError),

    /// Pipeline settings could not be read.
    #[error("configuration: {0}")]
    Config(#[from] dte_client::ConfigError),
}
