//! # Transmission Collaborator
//!
//! Submits a signed document to the tax authority's reception endpoint.
//!
//! Transport failures are not errors at this boundary: they come back as
//! an [`AuthorityResponse`] carrying a `COM-ERR` or `HTTP-<status>` entry,
//! so the pipeline can apply its retry and contingency policy from the
//! response alone. `Err` is reserved for replies that cannot be
//! interpreted at all.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use dte_core::response::COMMUNICATION_ERROR_CODE;
use dte_core::{
    AuthorityMessage, AuthorityResponse, AuthorityStatus, DocumentType, Environment,
    GenerationCode, SignatureEnvelope,
};

use crate::config::TransmissionConfig;
use crate::error::ClientError;

/// What gets sent for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub environment: Environment,
    /// Caller-chosen sequence for the send, echoed by the authority.
    pub send_id: u64,
    /// Schema version of the document.
    pub version: u32,
    pub document_type: DocumentType,
    pub generation_code: GenerationCode,
    pub signature: SignatureEnvelope,
}

#[async_trait]
pub trait Transmitter: Send + Sync {
    async fn transmit(&self, submission: &Submission) -> Result<AuthorityResponse, ClientError>;
}

// -- HTTP ---------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceptionBody<'a> {
    ambiente: &'a str,
    id_envio: u64,
    version: u32,
    tipo_dte: &'a str,
    documento: &'a str,
    codigo_generacion: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceptionReply {
    #[serde(default)]
    estado: Option<String>,
    #[serde(default)]
    sello_recibido: Option<String>,
    #[serde(default)]
    fh_procesamiento: Option<String>,
    #[serde(default)]
    codigo_msg: Option<String>,
    #[serde(default)]
    descripcion_msg: Option<String>,
    #[serde(default)]
    observaciones: Vec<String>,
}

impl ReceptionReply {
    fn into_response(self) -> AuthorityResponse {
        let status = self.estado.as_deref().and_then(AuthorityStatus::parse);
        let success = matches!(
            status,
            Some(AuthorityStatus::Processed | AuthorityStatus::ReceivedWithObservations)
        );
        let errors = if success {
            Vec::new()
        } else {
            self.codigo_msg
                .clone()
                .map(|code| {
                    vec![AuthorityMessage::new(
                        code,
                        self.descripcion_msg.clone().unwrap_or_default(),
                    )]
                })
                .unwrap_or_default()
        };
        AuthorityResponse {
            success,
            status,
            receipt_stamp: self.sello_recibido,
            receipt_timestamp: self.fh_procesamiento,
            errors,
            observations: self.observaciones,
            message: self.descripcion_msg,
        }
    }
}

/// Authority reception endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransmitter {
    http: reqwest::Client,
    config: TransmissionConfig,
}

impl HttpTransmitter {
    pub fn new(config: TransmissionConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Transmitter for HttpTransmitter {
    async fn transmit(&self, submission: &Submission) -> Result<AuthorityResponse, ClientError> {
        let endpoint = "POST /fesv/recepciondte";
        let body = ReceptionBody {
            ambiente: submission.environment.code(),
            id_envio: submission.send_id,
            version: submission.version,
            tipo_dte: submission.document_type.code(),
            documento: submission.signature.as_str(),
            codigo_generacion: submission.generation_code.as_str(),
        };

        let resp = match self
            .http
            .post(self.config.url.clone())
            .bearer_auth(self.config.token.expose())
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(
                    generation_code = %submission.generation_code,
                    error = %e,
                    "authority unreachable"
                );
                return Ok(AuthorityResponse::communication_failure(
                    COMMUNICATION_ERROR_CODE,
                    e.to_string(),
                ));
            }
        };

        let status = resp.status();
        if status.is_server_error() {
            return Ok(AuthorityResponse::communication_failure(
                format!("HTTP-{}", status.as_u16()),
                format!("{endpoint} returned {status}"),
            ));
        }

        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                return Ok(AuthorityResponse::communication_failure(
                    COMMUNICATION_ERROR_CODE,
                    e.to_string(),
                ))
            }
        };

        // Rejections arrive as 400 with a normal reply body.
        match serde_json::from_str::<ReceptionReply>(&text) {
            Ok(reply) => Ok(reply.into_response()),
            Err(_) if !status.is_success() => Err(ClientError::Api {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                body: text,
            }),
            Err(e) => Err(ClientError::Deserialization {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            }),
        }
    }
}

// -- Mock ---------------------------------------------------------------------

/// A scripted reply for [`MockTransmitter`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(AuthorityResponse),
    /// Sleep before answering with acceptance; used to trip call timeouts.
    Delay(Duration),
    Fail(String),
}

/// Transmitter that plays back scripted replies in order, then accepts.
#[derive(Debug, Default)]
pub struct MockTransmitter {
    script: Mutex<VecDeque<MockReply>>,
    attempts: AtomicU32,
    submissions: Mutex<Vec<Submission>>,
}

impl MockTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// `n` communication failures, then acceptance.
    pub fn failing_times(n: usize) -> Self {
        Self::with_script((0..n).map(|_| {
            MockReply::Respond(AuthorityResponse::communication_failure(
                COMMUNICATION_ERROR_CODE,
                "connection refused",
            ))
        }))
    }

    pub fn push(&self, reply: MockReply) {
        self.script.lock().push_back(reply);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    fn accepted(submission: &Submission, n: u32) -> AuthorityResponse {
        AuthorityResponse::accepted(
            format!("SELLO-{}-{n}", submission.generation_code),
            "2024-01-15T10:30:05",
        )
    }
}

#[async_trait]
impl Transmitter for MockTransmitter {
    async fn transmit(&self, submission: &Submission) -> Result<AuthorityResponse, ClientError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.submissions.lock().push(submission.clone());
        let next = self.script.lock().pop_front();
        match next {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Self::accepted(submission, n))
            }
            Some(MockReply::Fail(reason)) => Err(ClientError::Deserialization {
                endpoint: "mock".into(),
                reason,
            }),
            None => Ok(Self::accepted(submission, n)),
        }
    }
}
