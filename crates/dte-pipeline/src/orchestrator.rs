//! # Orchestrator
//!
//! Drives one run through the stages. The loop is the same for every
//! flow:
//!
//! 1. Pick the entry stage from the flow and starting status.
//! 2. Run the stage, merge its patch with [`RunState::apply`].
//! 3. Classify the merged status and look up the next stage in the
//!    routing table.
//! 4. Stop at [`Next::End`] or when the visit guard trips.
//!
//! A patch that breaks a lifecycle invariant, a missing route, or too
//! many visits fail the run with `ORCHESTRATION_ERROR` instead of
//! surfacing as `Err`.

use dte_core::FlowType;
use dte_schema::DocumentValidator;
use dte_state::{
    classify, entry, route, ErrorCode, Next, RunRequest, RunState, RunStatus, Stage, StatePatch,
    TransitionError, MAX_STAGE_VISITS,
};

use crate::config::PipelineConfig;
use crate::context::{Collaborators, StageContext};
use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::stages;

#[derive(Debug)]
pub struct Orchestrator {
    collaborators: Collaborators,
    validator: DocumentValidator,
    config: PipelineConfig,
    metrics: PipelineMetrics,
}

impl Orchestrator {
    /// An orchestrator validating against the embedded schema.
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self::with_validator(
            collaborators,
            config,
            DocumentValidator::new()?,
        ))
    }

    pub fn with_validator(
        collaborators: Collaborators,
        config: PipelineConfig,
        validator: DocumentValidator,
    ) -> Self {
        Self {
            collaborators,
            validator,
            config,
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one request end to end.
    pub async fn run(&self, request: RunRequest) -> RunState {
        let status = match request.flow {
            FlowType::Emission => RunStatus::Validating,
            FlowType::Reception => RunStatus::ProcessingReception,
        };
        self.drive(RunState::from_request(request), status, StatePatch::default())
            .await
    }

    /// Start directly in contingency, for outages declared by an operator.
    /// The document is reissued offline without a transmission attempt.
    /// Only issued documents can be reissued offline; other flows fail
    /// without visiting a stage.
    pub async fn run_contingency(&self, request: RunRequest, reason: Option<String>) -> RunState {
        let patch = if request.flow == FlowType::Emission {
            StatePatch {
                is_offline: Some(true),
                contingency_reason: reason,
                ..StatePatch::default()
            }
        } else {
            tracing::warn!(flow = ?request.flow, "forced contingency refused");
            StatePatch::failed(
                ErrorCode::ContingencyPrecondition,
                "La contingencia solo aplica a documentos emitidos",
                10,
            )
        };
        self.drive(RunState::from_request(request), RunStatus::Contingency, patch)
            .await
    }

    async fn drive(&self, mut state: RunState, status: RunStatus, extra: StatePatch) -> RunState {
        self.metrics.run_started();
        if let Err(e) = state.begin(status).and_then(|()| state.apply(extra)) {
            abort(&mut state, e);
            self.metrics.run_finished(state.outcome());
            return state;
        }

        if !state.status.is_terminal() {
            self.walk(&mut state).await;
        }

        tracing::info!(
            generation_code = ?state.generation_code().map(ToString::to_string),
            status = %state.status,
            outcome = ?state.outcome(),
            retries = state.retry_count(),
            offline = state.is_offline,
            "run finished"
        );
        self.metrics.run_finished(state.outcome());
        state
    }

    /// Visit stages from the entry point until the route ends or the run
    /// is aborted.
    async fn walk(&self, state: &mut RunState) {
        let ctx = StageContext {
            collaborators: &self.collaborators,
            validator: &self.validator,
            config: &self.config,
            metrics: &self.metrics,
        };
        let mut stage = entry(state.flow, state.status);
        let mut visits = 0usize;

        loop {
            visits += 1;
            if visits > MAX_STAGE_VISITS {
                abort(
                    state,
                    TransitionError::VisitLimitExceeded {
                        limit: MAX_STAGE_VISITS,
                    },
                );
                break;
            }

            let patch = self.visit(&ctx, stage, state).await;
            let next = state
                .apply(patch)
                .and_then(|()| classify(stage, state.status))
                .and_then(|outcome| {
                    tracing::debug!(
                        generation_code = ?state.generation_code().map(ToString::to_string),
                        stage = %stage,
                        outcome = ?outcome,
                        status = %state.status,
                        "stage finished"
                    );
                    route(stage, outcome)
                });
            match next {
                Ok(Next::Stage(following)) => stage = following,
                Ok(Next::End) => break,
                Err(e) => {
                    abort(state, e);
                    break;
                }
            }
        }
    }

    async fn visit(&self, ctx: &StageContext<'_>, stage: Stage, state: &RunState) -> StatePatch {
        match stage {
            Stage::Validation => stages::validation::run(ctx, state).await,
            Stage::Signing => stages::signing::run(ctx, state).await,
            Stage::Transmission => stages::transmission::run(ctx, state).await,
            Stage::Contingency => stages::contingency::run(ctx, state).await,
            Stage::Reception => stages::reception::run(state),
            Stage::ResponseRecorder => stages::recorder::run(ctx, state).await,
            Stage::TaxKeeper => stages::tax::run(ctx, state).await,
        }
    }
}

/// Fail the run for a routing or invariant error. Terminal runs keep their
/// status; the error is only logged.
fn abort(state: &mut RunState, error: TransitionError) {
    tracing::error!(
        generation_code = ?state.generation_code().map(ToString::to_string),
        status = %state.status,
        error = %error,
        "orchestration error"
    );
    if state.status.is_terminal() {
        return;
    }
    let patch = StatePatch::failed(ErrorCode::Orchestration, error.to_string(), state.progress);
    if let Err(e) = state.apply(patch) {
        tracing::error!(error = %e, "could not record orchestration failure");
    }
}
