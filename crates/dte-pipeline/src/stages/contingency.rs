//! # Offline Contingency
//!
//! When the authority cannot be reached the document is reissued as a
//! deferred-model variant, re-signed offline and stored for later
//! transmission. The variant keeps the generation code and business
//! content; only the identification block changes:
//!
//! - `tipoModelo = 2`, `tipoOperacion = 2`, `tipoContingencia = 2`
//! - `motivoContin` = the contingency reason
//! - `fecEmi` / `horEmi` = now in El Salvador local time, one second past
//!   the original stamp if the two coincide
//!
//! The original attempt is stored inside the record but the variant is
//! what counts.

use dte_client::SignRequest;
use dte_core::document::{CONTINGENCY_INTERNET_OUTAGE, MODEL_DEFERRED, OPERATION_CONTINGENCY};
use dte_core::{AuthorityResponse, AuthorityStatus, Dte, EmissionStamp, Nit};
use dte_state::{ErrorCode, RunState, RunStatus, Stage, StatePatch};
use dte_store::{DocumentClass, DocumentRecord, DocumentState};

use crate::context::StageContext;

/// Reason written when none was recorded.
pub const DEFAULT_REASON: &str = "Falla en el servicio de Internet";

/// Longest `motivoContin` the schema accepts.
const MAX_REASON_CHARS: usize = 150;

/// Build the deferred-model variant of `original` stamped at `stamp`.
pub fn contingency_variant(original: &Dte, reason: &str, stamp: EmissionStamp) -> Dte {
    let before = EmissionStamp::new(
        original.identification.emission_date,
        original.identification.emission_time,
    );
    let stamp = if stamp == before {
        stamp.next_second()
    } else {
        stamp
    };

    let mut variant = original.without_cycle_artifacts();
    let id = &mut variant.identification;
    id.model = MODEL_DEFERRED;
    id.operation = OPERATION_CONTINGENCY;
    id.contingency_type = Some(CONTINGENCY_INTERNET_OUTAGE);
    id.contingency_reason = Some(reason.chars().take(MAX_REASON_CHARS).collect());
    id.emission_date = stamp.date;
    id.emission_time = stamp.time;
    variant
}

pub async fn run(ctx: &StageContext<'_>, state: &RunState) -> StatePatch {
    let password = state
        .password
        .clone()
        .filter(|p| !p.is_empty())
        .or_else(|| state.signing.as_ref().map(|m| m.password.clone()));
    let (Some(original), Some(password), RunStatus::Contingency) =
        (state.document.as_ref(), password, state.status)
    else {
        return StatePatch::failed(
            ErrorCode::ContingencyPrecondition,
            "La contingencia requiere estado contingency, documento y contraseña de firma",
            70,
        );
    };

    let reason = state
        .contingency_reason
        .clone()
        .unwrap_or_else(|| DEFAULT_REASON.to_string());
    let now = ctx.collaborators.clock.now();
    let variant = contingency_variant(original, &reason, EmissionStamp::at(now));
    let code = variant.generation_code().clone();

    let report = ctx.validator.validate_document(&variant);
    let variant = match report.document {
        Some(doc) if report.violations.is_empty() => doc,
        _ => return failure(&report.error_strings().join("; ")),
    };

    let clean = match variant.without_cycle_artifacts().to_value() {
        Ok(value) => value,
        Err(e) => return failure(&e.to_string()),
    };
    let nit = Nit::normalize(&variant.issuer.nit);
    let api_token = state.signing.as_ref().and_then(|m| m.api_token.clone());
    let request = SignRequest {
        nit: &nit,
        password: &password,
        document: &clean,
        api_token: api_token.as_ref(),
    };
    let envelope = match ctx.bounded(ctx.collaborators.signer.sign(request)).await {
        Ok(Ok(envelope)) => envelope,
        Ok(Err(e)) => return failure(&e.to_string()),
        Err(_) => return failure("tiempo de espera agotado al firmar"),
    };

    let record = DocumentRecord {
        generation_code: code.clone(),
        business_id: state.business_id.clone(),
        environment: state.environment,
        document_type: variant.document_type(),
        control_number: variant.identification.control_number.clone(),
        state: DocumentState::Contingency,
        class: DocumentClass::Issued,
        document: variant.clone(),
        signature: Some(envelope.clone()),
        signature_digest: Some(envelope.digest_hex()),
        authority_response: None,
        receipt_stamp: None,
        processed_at: None,
        original_attempt: Some(original.clone()),
        updated_at: now,
    };
    match ctx.bounded(ctx.collaborators.documents.upsert(record)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return failure(&e.to_string()),
        Err(_) => return failure("tiempo de espera agotado al guardar"),
    }

    tracing::warn!(
        generation_code = %code,
        reason = %reason,
        "document signed offline and held in contingency"
    );
    let response = AuthorityResponse {
        success: false,
        status: Some(AuthorityStatus::Contingency),
        receipt_timestamp: Some(now.to_rfc3339()),
        message: Some("Documento en contingencia".to_string()),
        ..AuthorityResponse::default()
    };
    StatePatch {
        status: Some(RunStatus::Completed),
        document: Some(variant),
        is_offline: Some(true),
        contingency_reason: Some(reason),
        authority_response: Some(response),
        progress: Some(90),
        estimated_seconds: Some(5),
        ..StatePatch::default()
    }
    .with_signature(envelope)
    .with_step(Stage::Contingency.as_str())
}

fn failure(reason: &str) -> StatePatch {
    tracing::error!(reason, "contingency failed");
    let message = format!("Error generando contingencia: {reason}");
    StatePatch::failed(ErrorCode::Contingency, message.clone(), 70)
        .with_validation_errors(vec![message])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use dte_core::document::fixtures;

    fn original() -> Dte {
        Dte::from_value(fixtures::voucher_json()).unwrap()
    }

    #[test]
    fn variant_carries_deferred_markers() {
        let stamp = EmissionStamp::new(
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        );
        let v = contingency_variant(&original(), "corte de energía", stamp);
        assert_eq!(v.identification.model, MODEL_DEFERRED);
        assert_eq!(v.identification.operation, OPERATION_CONTINGENCY);
        assert_eq!(v.identification.contingency_type, Some(2));
        assert_eq!(v.identification.contingency_reason.as_deref(), Some("corte de energía"));
        assert_eq!(v.identification.emission_date, stamp.date);
        assert_eq!(v.generation_code(), original().generation_code());
        assert!(v.is_deferred());
    }

    #[test]
    fn identical_stamp_advances_one_second() {
        let o = original();
        let same = EmissionStamp::new(o.identification.emission_date, o.identification.emission_time);
        let v = contingency_variant(&o, DEFAULT_REASON, same);
        assert_eq!(
            v.identification.emission_time,
            NaiveTime::from_hms_opt(10, 30, 1).unwrap()
        );
    }

    #[test]
    fn long_reasons_are_truncated() {
        let o = original();
        let reason = "x".repeat(400);
        let stamp = EmissionStamp::new(
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        );
        let v = contingency_variant(&o, &reason, stamp);
        assert_eq!(v.identification.contingency_reason.unwrap().chars().count(), 150);
    }
}
