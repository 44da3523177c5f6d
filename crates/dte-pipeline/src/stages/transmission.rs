//! Submission to the authority, with in-place retry and escalation.
//!
//! | authority says | retries left | next status |
//! |---|---|---|
//! | accepted (with or without observations) | any | `completed` |
//! | `COM-ERR`, `HTTP-*` or call timeout | yes | `transmitting`, counter + 1 |
//! | `COM-ERR`, `HTTP-*` or call timeout | no | `contingency` |
//! | anything else | any | `failed`, not retryable |

use dte_client::Submission;
use dte_core::response::COMMUNICATION_ERROR_CODE;
use dte_core::{AuthorityResponse, Dte, SignatureEnvelope};
use dte_state::{ErrorCode, RunError, RunState, RunStatus, Stage, StatePatch};
use dte_store::{DocumentClass, DocumentRecord, DocumentState};

use crate::context::StageContext;

/// Contingency reason recorded when transmission gives up.
pub const COMMUNICATION_FAILURE_REASON: &str = "Falla de comunicación con MH";

pub async fn run(ctx: &StageContext<'_>, state: &RunState) -> StatePatch {
    let Some(signature) = state.signature().filter(|s| !s.is_empty()) else {
        return StatePatch::failed(
            ErrorCode::TransmitNoSignature,
            "No hay firma JWS para transmitir",
            50,
        );
    };
    let Some(document) = state.document.as_ref() else {
        return system_failure("no hay documento en el estado");
    };

    let submission = Submission {
        environment: state.environment,
        send_id: u64::from(state.retry_count()) + 1,
        version: document.identification.version,
        document_type: document.document_type(),
        generation_code: document.generation_code().clone(),
        signature: signature.clone(),
    };

    ctx.metrics.transmit_attempt();
    let response = match ctx
        .bounded(ctx.collaborators.transmitter.transmit(&submission))
        .await
    {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => return system_failure(&e.to_string()),
        Err(_) => AuthorityResponse::communication_failure(
            COMMUNICATION_ERROR_CODE,
            format!(
                "sin respuesta en {} s",
                ctx.config.call_timeout.as_secs()
            ),
        ),
    };

    if response.success {
        tracing::info!(
            generation_code = %submission.generation_code,
            receipt_stamp = response.receipt_stamp.as_deref().unwrap_or_default(),
            observations = response.has_observations(),
            "document accepted by the authority"
        );
        persist_accepted(ctx, state, document, signature, &response).await;
        return StatePatch {
            status: Some(RunStatus::Completed),
            is_transmitted: Some(true),
            authority_response: Some(response),
            progress: Some(90),
            estimated_seconds: Some(5),
            ..StatePatch::default()
        }
        .with_step(Stage::Transmission.as_str());
    }

    if response.is_communication_failure() {
        let attempt = state.retry_count() + 1;
        if state.retry_count() < ctx.config.retry_cap() {
            ctx.metrics.transmit_retry();
            tracing::warn!(
                generation_code = %submission.generation_code,
                attempt,
                max_retries = ctx.config.retry_cap(),
                "communication failure, retrying transmission"
            );
            return StatePatch {
                status: Some(RunStatus::Transmitting),
                retry_count: Some(attempt),
                authority_response: Some(response),
                progress: Some(60),
                estimated_seconds: Some(20),
                ..StatePatch::default()
            }
            .with_step(Stage::Transmission.as_str());
        }
        tracing::warn!(
            generation_code = %submission.generation_code,
            attempts = attempt,
            "communication failures exhausted retries, entering contingency"
        );
        return StatePatch {
            status: Some(RunStatus::Contingency),
            is_offline: Some(true),
            contingency_reason: Some(COMMUNICATION_FAILURE_REASON.to_string()),
            error: Some(RunError::new(
                ErrorCode::TransmitCommunication,
                "Falla de comunicación con Ministerio de Hacienda",
            )),
            retryable: Some(true),
            authority_response: Some(response),
            progress: Some(70),
            ..StatePatch::default()
        }
        .with_step(Stage::Transmission.as_str());
    }

    let summary = response.rejection_summary();
    tracing::warn!(
        generation_code = %submission.generation_code,
        reason = %summary,
        "document rejected by the authority"
    );
    StatePatch {
        authority_response: Some(response),
        ..StatePatch::failed(ErrorCode::TransmitMhValidation, summary, 60)
    }
}

async fn persist_accepted(
    ctx: &StageContext<'_>,
    state: &RunState,
    document: &Dte,
    signature: &SignatureEnvelope,
    response: &AuthorityResponse,
) {
    let now = ctx.collaborators.clock.now();
    let record = DocumentRecord {
        generation_code: document.generation_code().clone(),
        business_id: state.business_id.clone(),
        environment: state.environment,
        document_type: document.document_type(),
        control_number: document.identification.control_number.clone(),
        state: DocumentState::Processed,
        class: DocumentClass::Issued,
        document: document.clone(),
        signature: Some(signature.clone()),
        signature_digest: Some(signature.digest_hex()),
        authority_response: Some(response.clone()),
        receipt_stamp: response.receipt_stamp.clone(),
        processed_at: Some(now),
        original_attempt: None,
        updated_at: now,
    };
    match ctx.bounded(ctx.collaborators.documents.upsert(record)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(
            generation_code = %document.generation_code(),
            error = %e,
            "accepted document could not be stored"
        ),
        Err(_) => tracing::error!(
            generation_code = %document.generation_code(),
            "document store timed out storing accepted document"
        ),
    }
}

fn system_failure(reason: &str) -> StatePatch {
    tracing::error!(reason, "transmission failed");
    StatePatch::failed(
        ErrorCode::TransmitSystem,
        format!("Error transmisión: {reason}"),
        60,
    )
}
