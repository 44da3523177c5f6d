//! Credential resolution and the call to the signing service.

use dte_client::{wake, SignRequest};
use dte_core::{BusinessId, Nit};
use dte_state::{ErrorCode, RunState, RunStatus, SigningMaterial, Stage, StatePatch};

use crate::context::StageContext;

pub async fn run(ctx: &StageContext<'_>, state: &RunState) -> StatePatch {
    let Some(document) = state.document.as_ref() else {
        return StatePatch::failed(ErrorCode::SignNoDte, "No hay DTE para firmar", 25);
    };
    let signer = &ctx.collaborators.signer;

    wake(ctx.config.wake, move || async move {
        ctx.bounded(signer.health_check()).await.unwrap_or(false)
    })
    .await;

    let clean = match document.without_cycle_artifacts().to_value() {
        Ok(value) => value,
        Err(e) => return service_failure(&e.to_string()),
    };
    let issuer_nit = Nit::normalize(&document.issuer.nit);
    let lookup = state
        .business_id
        .as_ref()
        .map(|b| Nit::normalize(b.as_str()))
        .unwrap_or_else(|| issuer_nit.clone());
    let environment = state.environment;

    let no_credentials = || {
        StatePatch::failed(
            ErrorCode::SignNoCredentials,
            format!(
                "El NIT {lookup} no está registrado o no tiene credenciales activas para el ambiente {}",
                environment.code()
            ),
            25,
        )
    };

    let Ok(business) = BusinessId::new(lookup.clone()) else {
        return no_credentials();
    };
    let credentials = match ctx
        .bounded(ctx.collaborators.credentials.resolve(&business, environment))
        .await
    {
        Ok(Ok(Some(record))) => record,
        Ok(Ok(None)) => {
            tracing::error!(business_id = %lookup, environment = environment.as_str(), "no signing credentials");
            return no_credentials();
        }
        Ok(Err(e)) => return service_failure(&e.to_string()),
        Err(_) => return service_failure("tiempo de espera agotado consultando credenciales"),
    };

    if !credentials.active {
        tracing::error!(business_id = %lookup, "license inactive");
        return StatePatch::failed(
            ErrorCode::SignInactiveLicense,
            format!(
                "El servicio DTE se encuentra suspendido para el contribuyente {lookup}. Por favor verifique su licencia o suscripción."
            ),
            25,
        );
    }

    let password = state
        .password
        .clone()
        .filter(|p| !p.is_empty())
        .or_else(|| credentials.password.clone().filter(|p| !p.is_empty()));
    let Some(password) = password else {
        return StatePatch::failed(
            ErrorCode::SignNoPassword,
            "La contraseña del certificado no está configurada en la base de datos para este NIT",
            25,
        );
    };

    let request = SignRequest {
        nit: &issuer_nit,
        password: &password,
        document: &clean,
        api_token: credentials.api_token.as_ref(),
    };
    match ctx.bounded(signer.sign(request)).await {
        Ok(Ok(envelope)) => {
            tracing::info!(generation_code = %document.generation_code(), "document signed");
            StatePatch {
                status: Some(RunStatus::Transmitting),
                signing: Some(SigningMaterial {
                    nit: issuer_nit.clone(),
                    password: password.clone(),
                    api_token: credentials.api_token.clone(),
                }),
                progress: Some(50),
                estimated_seconds: Some(30),
                ..StatePatch::default()
            }
            .with_signature(envelope)
            .with_step(Stage::Signing.as_str())
        }
        Ok(Err(e)) => service_failure(&e.to_string()),
        Err(_) => service_failure("tiempo de espera agotado"),
    }
}

fn service_failure(reason: &str) -> StatePatch {
    tracing::error!(reason, "signing failed");
    StatePatch::failed(ErrorCode::SignService, format!("Error al firmar: {reason}"), 40)
}
