//! Persists the authority's verdict for an accepted document.

use dte_state::{RunState, Stage, StatePatch};
use dte_store::ResponseRecord;

use crate::context::StageContext;

/// Best-effort: a store failure is logged and the run moves on.
pub async fn run(ctx: &StageContext<'_>, state: &RunState) -> StatePatch {
    let patch = StatePatch::default().with_step(Stage::ResponseRecorder.as_str());
    let (Some(code), Some(response)) = (state.generation_code(), state.authority_response.as_ref())
    else {
        return patch;
    };

    let record = ResponseRecord {
        generation_code: code.clone(),
        business_id: state.business_id.clone(),
        response: response.clone(),
        recorded_at: ctx.collaborators.clock.now(),
    };
    match ctx.bounded(ctx.collaborators.documents.upsert_response(record)).await {
        Ok(Ok(())) => tracing::debug!(generation_code = %code, "authority response recorded"),
        Ok(Err(e)) => {
            ctx.metrics.bookkeeping_failure();
            tracing::warn!(generation_code = %code, error = %e, "authority response not recorded");
        }
        Err(_) => {
            ctx.metrics.bookkeeping_failure();
            tracing::warn!(generation_code = %code, "authority response store timed out");
        }
    }
    patch
}
