//! A full emission against wiremock stand-ins for both services.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dte_client::{HttpSigner, HttpTransmitter, SigningConfig, TransmissionConfig, WakePolicy};
use dte_core::document::fixtures;
use dte_core::{BusinessId, Dte, Environment, Secret};
use dte_pipeline::{Collaborators, Orchestrator, PipelineConfig};
use dte_state::{RunOutcome, RunRequest};
use dte_store::{
    CredentialRecord, InMemoryAccumulatorStore, InMemoryCredentialStore, InMemoryDocumentStore,
};

async fn orchestrator(server: &MockServer) -> Orchestrator {
    let signer = HttpSigner::new(SigningConfig {
        url: Url::parse(&format!("{}/firma", server.uri())).unwrap(),
        token: None,
        timeout_secs: 5,
    })
    .unwrap();
    let transmitter = HttpTransmitter::new(TransmissionConfig {
        url: Url::parse(&format!("{}/fesv/recepciondte", server.uri())).unwrap(),
        token: Secret::new("mh-token"),
        mode: Environment::Sandbox,
        timeout_secs: 5,
    })
    .unwrap();

    let credentials = InMemoryCredentialStore::new();
    credentials.insert(CredentialRecord {
        business_id: BusinessId::new("06140101901013").unwrap(),
        environment: Environment::Sandbox,
        password: Some(Secret::new("cert-pass")),
        api_token: Some(Secret::new("business-token")),
        active: true,
    });

    let collaborators = Collaborators::new(
        Arc::new(signer),
        Arc::new(transmitter),
        Arc::new(credentials),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryAccumulatorStore::new()),
    );
    let config = PipelineConfig {
        wake: WakePolicy {
            attempts: 1,
            base_delay: Duration::from_millis(1),
        },
        ..PipelineConfig::default()
    };
    Orchestrator::new(collaborators, config).unwrap()
}

fn request() -> RunRequest {
    RunRequest {
        document: Some(Dte::from_value(fixtures::voucher_json()).unwrap()),
        ..RunRequest::default()
    }
}

#[tokio::test]
async fn signs_and_transmits_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/firma"))
        .and(header("authorization", "Bearer business-token"))
        .and(body_partial_json(json!({"nit": "06140101901013", "passwordPri": "cert-pass"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "jws": "h.p.s"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fesv/recepciondte"))
        .and(header("authorization", "Bearer mh-token"))
        .and(body_partial_json(json!({"documento": "h.p.s", "idEnvio": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "estado": "PROCESADO",
            "selloRecibido": "2024SELLO",
            "fhProcesamiento": "16/01/2024 08:00:01",
            "codigoMsg": "001",
            "descripcionMsg": "RECIBIDO",
            "observaciones": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = orchestrator(&server).await.run(request()).await;

    assert_eq!(state.outcome(), RunOutcome::Completed, "{:?}", state.error);
    assert_eq!(state.signature().map(|s| s.as_str()), Some("h.p.s"));
    assert_eq!(
        state
            .authority_response
            .as_ref()
            .and_then(|r| r.receipt_stamp.as_deref()),
        Some("2024SELLO")
    );
}

#[tokio::test]
async fn unavailable_authority_ends_in_contingency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/firma"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "jws": "h.p.s"})),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fesv/recepciondte"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let state = orchestrator(&server).await.run(request()).await;

    assert_eq!(state.outcome(), RunOutcome::Contingency);
    assert_eq!(state.retry_count(), 2);
    assert!(state.document.unwrap().is_deferred());
}
