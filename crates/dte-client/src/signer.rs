//! # Signing Collaborator
//!
//! The signing service holds each taxpayer's certificate and returns a
//! compact JWS over the document JSON. The pipeline only sees the
//! [`Signer`] trait; [`HttpSigner`] talks to the real service and
//! [`MockSigner`] stands in for it in tests.
//!
//! ## Wire Contract
//!
//! `POST {url}` with a bearer token and body
//! `{"nit": "...", "passwordPri": "...", "dteJson": {...}}`, answered by
//! `{"success": bool, "jws"?: "...", "error"?: "..."}`.
//! `GET {health_url}` answers 200 when the service is up.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dte_core::{Secret, SignatureEnvelope};

use crate::config::SigningConfig;
use crate::error::ClientError;

/// Inputs for one signature.
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    /// Issuer NIT, digits only.
    pub nit: &'a str,
    pub password: &'a Secret,
    /// The cleaned document JSON.
    pub document: &'a Value,
    /// Per-business bearer token; falls back to the configured one.
    pub api_token: Option<&'a Secret>,
}

#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, request: SignRequest<'_>) -> Result<SignatureEnvelope, ClientError>;

    /// Whether the service answers its health endpoint.
    async fn health_check(&self) -> bool;
}

// -- HTTP ---------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignBody<'a> {
    nit: &'a str,
    password_pri: &'a str,
    dte_json: &'a Value,
}

#[derive(Deserialize)]
struct SignReply {
    success: bool,
    #[serde(default)]
    jws: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Signing service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSigner {
    http: reqwest::Client,
    config: SigningConfig,
}

impl HttpSigner {
    pub fn new(config: SigningConfig) -> Result<Self, ClientError> {
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
impl Signer for HttpSigner {
    async fn sign(&self, request: SignRequest<'_>) -> Result<SignatureEnvelope, ClientError> {
        let endpoint = "POST /firma";
        let body = SignBody {
            nit: request.nit,
            password_pri: request.password.expose(),
            dte_json: request.document,
        };

        let mut builder = self.http.post(self.config.url.clone()).json(&body);
        if let Some(token) = request.api_token.or(self.config.token.as_ref()) {
            builder = builder.bearer_auth(token.expose());
        }

        tracing::info!(nit = request.nit, "requesting document signature");
        let resp = builder.send().await.map_err(|e| ClientError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ClientError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        // The service reports refusals in the body, sometimes with a 4xx.
        let reply: SignReply = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Api {
                    endpoint: endpoint.into(),
                    status: status.as_u16(),
                    body: text,
                })
            }
            Err(e) => {
                return Err(ClientError::Deserialization {
                    endpoint: endpoint.into(),
                    reason: e.to_string(),
                })
            }
        };

        match reply {
            SignReply {
                success: true,
                jws: Some(jws),
                ..
            } if !jws.trim().is_empty() => Ok(SignatureEnvelope::new(jws)),
            SignReply { error, .. } => Err(ClientError::SigningRefused {
                reason: error.unwrap_or_else(|| "Error en la firma del documento".to_string()),
            }),
        }
    }

    async fn health_check(&self) -> bool {
        match self.http.get(self.config.health_url()).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "signing service health probe failed");
                false
            }
        }
    }
}

// -- Mock ---------------------------------------------------------------------

/// One recorded [`MockSigner::sign`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SignCall {
    pub nit: String,
    pub document: Value,
    pub had_api_token: bool,
}

/// In-process signer for tests. Produces `mock.<payload>.<n>` envelopes
/// where `<payload>` is the document's generation code.
#[derive(Debug, Default)]
pub struct MockSigner {
    calls: Mutex<Vec<SignCall>>,
    failure: Mutex<Option<String>>,
    unhealthy: bool,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signer whose every call is refused with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Mutex::new(Some(reason.into())),
            ..Self::default()
        }
    }

    /// A signer whose health probe always fails.
    pub fn unhealthy() -> Self {
        Self {
            unhealthy: true,
            ..Self::default()
        }
    }

    /// Switch failure mode for subsequent calls.
    pub fn set_failure(&self, reason: Option<String>) {
        *self.failure.lock() = reason;
    }

    pub fn calls(&self) -> Vec<SignCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Signer for MockSigner {
    async fn sign(&self, request: SignRequest<'_>) -> Result<SignatureEnvelope, ClientError> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push(SignCall {
                nit: request.nit.to_string(),
                document: request.document.clone(),
                had_api_token: request.api_token.is_some(),
            });
            calls.len()
        };
        if let Some(reason) = self.failure.lock().clone() {
            return Err(ClientError::SigningRefused { reason });
        }
        let code = request
            .document
            .pointer("/identificacion/codigoGeneracion")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        Ok(SignatureEnvelope::new(format!("mock.{code}.{n}")))
    }

    async fn health_check(&self) -> bool {
        !self.unhealthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_records_calls_and_numbers_envelopes() {
        let signer = MockSigner::new();
        let doc = json!({"identificacion": {"codigoGeneracion": "ABC"}});
        let pw = Secret::new("pw");
        let req = SignRequest {
            nit: "06140101901013",
            password: &pw,
            document: &doc,
            api_token: None,
        };
        assert_eq!(signer.sign(req).await.unwrap().as_str(), "mock.ABC.1");
        assert_eq!(signer.sign(req).await.unwrap().as_str(), "mock.ABC.2");
        assert_eq!(signer.calls().len(), 2);
        assert!(!signer.calls()[0].had_api_token);
    }

    #[tokio::test]
    async fn failing_mock_refuses() {
        let signer = MockSigner::failing("certificado vencido");
        let doc = json!({});
        let pw = Secret::new("pw");
        let err = signer
            .sign(SignRequest {
                nit: "1",
                password: &pw,
                document: &doc,
                api_token: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::SigningRefused { reason } if reason == "certificado vencido"));
    }
}
