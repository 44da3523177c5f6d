//! `dte process`: run one document through the pipeline.
//!
//! Collaborators come from the environment: the signing service and the
//! authority endpoint per [`SigningConfig::from_env`] and
//! [`TransmissionConfig::from_env`], pipeline tuning per
//! [`PipelineConfig::from_env`], and the signing credentials of the one
//! business this invocation acts for:
//!
//! - `DTE_NIT` (required)
//! - `DTE_CERT_PASSWORD` (optional; `--password-env` names another variable)
//! - `DTE_BUSINESS_TOKEN` (optional per-business bearer token)
//!
//! Document and accumulator records go to a JSON directory store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use dte_client::{HttpSigner, HttpTransmitter, SigningConfig, TransmissionConfig};
use dte_core::{BusinessId, Dte, Environment, FlowType, Secret};
use dte_pipeline::{Collaborators, Orchestrator, PipelineConfig};
use dte_response::ProcessResponse;
use dte_state::{RawPayload, RunOutcome, RunRequest, RunState};
use dte_store::{CredentialRecord, InMemoryCredentialStore, JsonDirStore};

use crate::{print_json, read_json, runtime};

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Path to the document JSON.
    pub path: PathBuf,

    /// Book the document as a purchase instead of emitting it.
    #[arg(long, conflicts_with = "contingency")]
    pub reception: bool,

    /// Skip transmission and sign offline, with an optional reason.
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    pub contingency: Option<String>,

    /// Directory of the JSON record store.
    #[arg(long, default_value = "dte-data")]
    pub data_dir: PathBuf,

    /// Environment variable holding the certificate password.
    #[arg(long, default_value = "DTE_CERT_PASSWORD")]
    pub password_env: String,
}

/// Exit code for a finished run.
pub fn exit_code(outcome: RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Completed => 0,
        RunOutcome::Failed => 1,
        RunOutcome::Contingency => 3,
        RunOutcome::InProgress => 4,
    }
}

fn env_secret(var: &str) -> Option<Secret> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Secret::new)
}

fn credentials(environment: Environment, password_env: &str) -> Result<InMemoryCredentialStore> {
    let nit = std::env::var("DTE_NIT").context("DTE_NIT environment variable is required")?;
    let store = InMemoryCredentialStore::new();
    store.insert(CredentialRecord {
        business_id: BusinessId::new(nit)?,
        environment,
        password: env_secret(password_env),
        api_token: env_secret("DTE_BUSINESS_TOKEN"),
        active: true,
    });
    Ok(store)
}

/// Build the request for `args` from the file contents.
pub fn request(args: &ProcessArgs, environment: Environment) -> Result<RunRequest> {
    if args.reception {
        let text = std::fs::read_to_string(&args.path)
            .with_context(|| format!("failed to read {}", args.path.display()))?;
        return Ok(RunRequest {
            raw_input: Some(RawPayload::Text(text)),
            flow: FlowType::Reception,
            environment,
            ..RunRequest::default()
        });
    }
    let document = Dte::from_value(read_json(&args.path)?)
        .with_context(|| format!("{} is not a DTE", args.path.display()))?;
    Ok(RunRequest {
        document: Some(document),
        password: env_secret(&args.password_env),
        environment,
        ..RunRequest::default()
    })
}

pub fn run_process(args: &ProcessArgs) -> Result<u8> {
    let transmission = TransmissionConfig::from_env()?;
    let environment = transmission.mode;
    let signer = HttpSigner::new(SigningConfig::from_env()?)?;
    let transmitter = HttpTransmitter::new(transmission)?;
    let config = PipelineConfig::from_env()?;
    let request = request(args, environment)?;
    let credentials = credentials(environment, &args.password_env)?;

    let state: RunState = runtime()?.block_on(async {
        let store = Arc::new(JsonDirStore::open(args.data_dir.clone()).await?);
        let collaborators = Collaborators::new(
            Arc::new(signer),
            Arc::new(transmitter),
            Arc::new(credentials),
            store.clone(),
            store,
        );
        let orchestrator = Orchestrator::new(collaborators, config)?;
        let state = match &args.contingency {
            Some(reason) => {
                let reason = Some(reason.clone()).filter(|r| !r.trim().is_empty());
                orchestrator.run_contingency(request, reason).await
            }
            None => orchestrator.run(request).await,
        };
        anyhow::Ok(state)
    })?;

    tracing::info!(
        status = state.status.as_str(),
        progress = state.progress,
        step = %state.current_step,
        "processing finished"
    );
    print_json(&ProcessResponse::from_run(&state))?;
    Ok(exit_code(state.outcome()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::document::fixtures;

    fn args(path: PathBuf, reception: bool) -> ProcessArgs {
        ProcessArgs {
            path,
            reception,
            contingency: None,
            data_dir: PathBuf::from("unused"),
            password_env: "DTE_TEST_UNSET_PASSWORD_VAR".into(),
        }
    }

    #[test]
    fn emission_request_carries_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dte.json");
        std::fs::write(&path, fixtures::voucher_json().to_string()).unwrap();

        let req = request(&args(path, false), Environment::Sandbox).unwrap();
        assert_eq!(req.flow, FlowType::Emission);
        assert!(req.document.is_some());
        assert!(req.password.is_none());
    }

    #[test]
    fn reception_request_keeps_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compra.json");
        std::fs::write(&path, "{\"not\": \"checked yet\"}").unwrap();

        let req = request(&args(path, true), Environment::Production).unwrap();
        assert_eq!(req.flow, FlowType::Reception);
        assert_eq!(req.environment, Environment::Production);
        assert!(matches!(req.raw_input, Some(RawPayload::Text(_))));
        assert!(req.document.is_none());
    }

    #[test]
    fn outcomes_map_to_exit_codes() {
        assert_eq!(exit_code(RunOutcome::Completed), 0);
        assert_eq!(exit_code(RunOutcome::Failed), 1);
        assert_eq!(exit_code(RunOutcome::Contingency), 3);
    }
}
