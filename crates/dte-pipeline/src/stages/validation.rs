//! Schema and arithmetic checks before anything is signed.

use dte_state::{ErrorCode, RunState, RunStatus, Stage, StatePatch};

use crate::context::StageContext;

const NO_DOCUMENT: &str = "No se proporcionó un objeto DTE";

pub async fn run(ctx: &StageContext<'_>, state: &RunState) -> StatePatch {
    let Some(document) = state.document.as_ref() else {
        return StatePatch {
            is_valid: Some(false),
            ..StatePatch::failed(ErrorCode::ValidationNoDte, NO_DOCUMENT, 5)
                .with_validation_errors(vec![NO_DOCUMENT.to_string()])
        };
    };

    let report = ctx.validator.validate_document(document);
    match report.document {
        Some(normalized) if report.violations.is_empty() => {
            tracing::info!(generation_code = %normalized.generation_code(), "document validated");
            StatePatch {
                status: Some(RunStatus::Signing),
                document: Some(normalized),
                is_valid: Some(true),
                validation_errors: Some(Vec::new()),
                progress: Some(25),
                estimated_seconds: Some(45),
                ..StatePatch::default()
            }
            .with_step(Stage::Validation.as_str())
        }
        _ if report.violations.is_empty() => {
            tracing::error!(
                generation_code = %document.generation_code(),
                "validator returned neither a document nor violations"
            );
            StatePatch {
                is_valid: Some(false),
                ..StatePatch::failed(
                    ErrorCode::ValidationSystem,
                    "Error del sistema al validar DTE",
                    20,
                )
            }
        }
        _ => {
            let errors = report.error_strings();
            tracing::warn!(
                generation_code = %document.generation_code(),
                count = errors.len(),
                "document rejected by validator"
            );
            StatePatch {
                is_valid: Some(false),
                ..StatePatch::failed(
                    ErrorCode::ValidationFields,
                    "El DTE tiene campos inválidos",
                    20,
                )
                .with_validation_errors(errors)
            }
        }
    }
}
