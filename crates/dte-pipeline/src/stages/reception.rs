//! Intake of a document issued by a supplier.
//!
//! Received documents were signed and transmitted by their issuer, so
//! they are taken as valid without re-running the validator.

use dte_state::{ErrorCode, RunState, RunStatus, Stage, StatePatch};

pub fn run(state: &RunState) -> StatePatch {
    let accepted = |document| StatePatch {
        status: Some(RunStatus::Completed),
        is_valid: Some(true),
        document,
        progress: Some(90),
        estimated_seconds: Some(5),
        ..StatePatch::default()
    };

    if state.document.is_some() {
        return accepted(None).with_step(Stage::Reception.as_str());
    }

    let Some(raw) = state.raw_input.as_ref() else {
        return reception_failure(ErrorCode::ReceptionNoDte, "No se proporcionó DTE de compra");
    };
    match raw.to_document() {
        Ok(document) => {
            tracing::info!(generation_code = %document.generation_code(), "received document parsed");
            StatePatch {
                generation_code: Some(document.generation_code().clone()),
                ..accepted(Some(document))
            }
            .with_step(Stage::Reception.as_str())
        }
        Err(e) => {
            tracing::warn!(error = %e, "received document could not be parsed");
            reception_failure(ErrorCode::ReceptionParse, "Error parseando JSON recibido")
        }
    }
}

fn reception_failure(code: ErrorCode, message: &str) -> StatePatch {
    StatePatch {
        is_valid: Some(false),
        ..StatePatch::failed(code, message, 10)
            .with_validation_errors(vec![message.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::document::fixtures;
    use dte_core::FlowType;
    use dte_state::{RawPayload, RunRequest};

    fn state_with(raw: Option<RawPayload>) -> RunState {
        RunState::from_request(RunRequest {
            raw_input: raw,
            flow: FlowType::Reception,
            ..RunRequest::default()
        })
    }

    #[test]
    fn raw_json_text_is_parsed() {
        let text = fixtures::voucher_json().to_string();
        let patch = run(&state_with(Some(RawPayload::Text(text))));
        assert_eq!(patch.status, Some(RunStatus::Completed));
        assert_eq!(patch.is_valid, Some(true));
        assert!(patch.document.is_some());
        assert!(patch.generation_code.is_some());
    }

    #[test]
    fn unparseable_text_fails() {
        let patch = run(&state_with(Some(RawPayload::Text("{not json".into()))));
        assert_eq!(patch.status, Some(RunStatus::Failed));
        assert_eq!(patch.error.unwrap().code, ErrorCode::ReceptionParse);
        assert_eq!(
            patch.validation_errors,
            Some(vec!["Error parseando JSON recibido".to_string()])
        );
    }

    #[test]
    fn nothing_supplied_fails() {
        let patch = run(&state_with(None));
        assert_eq!(patch.error.unwrap().code, ErrorCode::ReceptionNoDte);
        assert_eq!(patch.retryable, Some(false));
    }
}
