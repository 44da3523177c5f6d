//! Monthly accumulator update for a completed run.
//!
//! Bookkeeping never fails a run: every error is logged, counted and
//! swallowed, leaving `tax_impact` unset.

use dte_core::{BusinessId, Dte, FlowType, Nit, PeriodKey};
use dte_state::{RunState, RunStatus, Stage, StatePatch};
use dte_tax::{ApplyOutcome, MonthlyAccumulator, SCOPE_ALL};

use crate::context::StageContext;

/// The business whose books the document lands in: the explicit business
/// id, else the issuer for emissions and the receiver for receptions.
pub fn book_owner(state: &RunState, document: &Dte) -> Option<BusinessId> {
    if let Some(id) = &state.business_id {
        return Some(id.clone());
    }
    let raw = match state.flow {
        FlowType::Emission => Some(document.issuer.nit.clone()),
        FlowType::Reception => document.receiver_id(),
    }?;
    BusinessId::new(Nit::normalize(&raw)).ok()
}

pub async fn run(ctx: &StageContext<'_>, state: &RunState) -> StatePatch {
    let done = StatePatch {
        progress: Some(100),
        estimated_seconds: Some(0),
        ..StatePatch::default()
    }
    .with_step(Stage::TaxKeeper.as_str());

    let (RunStatus::Completed, Some(document)) = (state.status, state.document.as_ref()) else {
        return done;
    };
    let Some(business) = book_owner(state, document) else {
        ctx.metrics.bookkeeping_failure();
        tracing::warn!(generation_code = %document.generation_code(), "no business to book the document under");
        return done;
    };

    match update(ctx, &business, document, state.flow).await {
        Ok(accumulator) => StatePatch {
            tax_impact: Some(accumulator),
            ..done
        },
        Err(reason) => {
            ctx.metrics.bookkeeping_failure();
            tracing::warn!(
                generation_code = %document.generation_code(),
                business_id = %business,
                reason = %reason,
                "tax accumulator not updated"
            );
            done
        }
    }
}

async fn update(
    ctx: &StageContext<'_>,
    business: &BusinessId,
    document: &Dte,
    flow: FlowType,
) -> Result<MonthlyAccumulator, String> {
    let store = &ctx.collaborators.accumulators;
    let now = ctx.collaborators.clock.now();
    let period = PeriodKey::from_date(document.identification.emission_date);

    let existing = ctx
        .bounded(store.get(business, period, SCOPE_ALL))
        .await
        .map_err(|_| "accumulator store timed out".to_string())?
        .map_err(|e| e.to_string())?;
    let mut accumulator =
        existing.unwrap_or_else(|| MonthlyAccumulator::empty(business.clone(), period, now));

    match accumulator
        .apply(document, flow, now)
        .map_err(|e| e.to_string())?
    {
        ApplyOutcome::Applied => {}
        ApplyOutcome::AlreadyApplied => {
            tracing::debug!(generation_code = %document.generation_code(), "document already booked");
            return Ok(accumulator);
        }
    }

    ctx.bounded(store.upsert(accumulator.clone()))
        .await
        .map_err(|_| "accumulator store timed out".to_string())?
        .map_err(|e| e.to_string())?;
    tracing::info!(
        generation_code = %document.generation_code(),
        period = %period,
        flow = flow.as_str(),
        "tax accumulator updated"
    );
    Ok(accumulator)
}
