//! # Run State
//!
//! One record per processing request. Stages never mutate it directly:
//! each returns a [`StatePatch`] and the orchestrator merges it with
//! [`RunState::apply`], which enforces the lifecycle invariants.
//!
//! ## Status Lifecycle
//!
//! ```text
//! Draft ──▶ Validating ──▶ Signing ──▶ Transmitting ──▶ Completed
//!   │           │            │          │  ▲  │  │
//!   │           ▼            ▼          └──┘  │  └──▶ Failed
//!   │         Failed       Failed     (retry) ▼
//!   ├──────────────────────────────────▶ Contingency ──▶ Completed | Failed
//!   └──▶ ProcessingReception ──▶ Completed | Failed
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dte_core::{
    AuthorityResponse, BusinessId, Dte, Environment, FlowType, GenerationCode, Secret,
    SignatureEnvelope,
};
use dte_tax::MonthlyAccumulator;

use crate::code::ErrorCode;
use crate::transition::{TransitionError, MAX_TRANSMIT_RETRIES};

/// Step name before any stage has run.
pub const INITIAL_STEP: &str = "start";

/// Estimated seconds for a fresh run.
pub const INITIAL_ESTIMATE_SECS: u32 = 60;

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Draft,
    Validating,
    Signing,
    Transmitting,
    Completed,
    Failed,
    Contingency,
    ProcessingReception,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Validating => "validating",
            Self::Signing => "signing",
            Self::Transmitting => "transmitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Contingency => "contingency",
            Self::ProcessingReception => "processing_reception",
        }
    }

    /// Whether no stage may change this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a patch may move the run from `self` to `next`. Keeping the
    /// same status is always allowed; the only self-loop that means
    /// anything is the transmission retry.
    pub fn can_change_to(&self, next: RunStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Self::Draft => matches!(
                next,
                Self::Validating | Self::ProcessingReception | Self::Contingency | Self::Failed
            ),
            Self::Validating => matches!(next, Self::Signing | Self::Failed),
            Self::Signing => matches!(next, Self::Transmitting | Self::Failed),
            Self::Transmitting => {
                matches!(next, Self::Completed | Self::Contingency | Self::Failed)
            }
            Self::Contingency | Self::ProcessingReception => {
                matches!(next, Self::Completed | Self::Failed)
            }
            Self::Completed | Self::Failed => false,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a finished run ended, as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Accepted by the authority, or a received document recorded.
    Completed,
    /// Signed offline and held for deferred transmission.
    Contingency,
    Failed,
    /// Not finished; only seen when a run is inspected mid-flight.
    InProgress,
}

// ─── Inputs ──────────────────────────────────────────────────────────

/// A document supplied in unparsed form, as reception sometimes gets it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Json(Value),
    Text(String),
}

impl RawPayload {
    /// Parse into a document.
    pub fn to_document(&self) -> Result<Dte, dte_core::DocumentError> {
        match self {
            Self::Json(value) => Dte::from_value(value.clone()),
            Self::Text(text) => Dte::from_json_str(text),
        }
    }

    /// Parse into a JSON value without decoding the document.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Json(value) => Ok(value.clone()),
            Self::Text(text) => serde_json::from_str(text),
        }
    }
}

/// Credentials resolved by the signing stage and kept for an offline
/// re-sign under contingency.
#[derive(Debug, Clone)]
pub struct SigningMaterial {
    /// NIT the signing service keys the certificate by.
    pub nit: String,
    pub password: Secret,
    pub api_token: Option<Secret>,
}

/// Caller-supplied fields of a processing request.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub document: Option<Dte>,
    pub raw_input: Option<RawPayload>,
    pub password: Option<Secret>,
    pub environment: Environment,
    pub flow: FlowType,
    pub business_id: Option<BusinessId>,
    pub device_id: Option<String>,
}

/// A stage failure recorded on the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub code: ErrorCode,
    pub message: String,
}

impl RunError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ─── State ───────────────────────────────────────────────────────────

/// The run record.
#[derive(Debug, Clone)]
pub struct RunState {
    pub document: Option<Dte>,
    pub raw_input: Option<RawPayload>,
    /// Password supplied with the request, if any.
    pub password: Option<Secret>,
    /// Credentials used by the last successful signing.
    pub signing: Option<SigningMaterial>,
    pub environment: Environment,
    pub flow: FlowType,
    pub business_id: Option<BusinessId>,
    pub device_id: Option<String>,
    generation_code: Option<GenerationCode>,
    pub status: RunStatus,
    pub is_valid: bool,
    pub validation_errors: Vec<String>,
    signature: Option<SignatureEnvelope>,
    pub is_transmitted: bool,
    pub authority_response: Option<AuthorityResponse>,
    pub is_offline: bool,
    pub contingency_reason: Option<String>,
    retry_count: u32,
    pub progress: u8,
    pub current_step: String,
    pub estimated_seconds: u32,
    pub error: Option<RunError>,
    pub retryable: bool,
    /// Accumulator as left by the tax keeper.
    pub tax_impact: Option<MonthlyAccumulator>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            document: None,
            raw_input: None,
            password: None,
            signing: None,
            environment: Environment::Sandbox,
            flow: FlowType::Emission,
            business_id: None,
            device_id: None,
            generation_code: None,
            status: RunStatus::Draft,
            is_valid: false,
            validation_errors: Vec::new(),
            signature: None,
            is_transmitted: false,
            authority_response: None,
            is_offline: false,
            contingency_reason: None,
            retry_count: 0,
            progress: 0,
            current_step: INITIAL_STEP.to_string(),
            estimated_seconds: INITIAL_ESTIMATE_SECS,
            error: None,
            retryable: true,
            tax_impact: None,
        }
    }
}

impl RunState {
    /// Defaults overlaid with the caller's fields. Status stays `draft`
    /// until [`RunState::begin`].
    pub fn from_request(request: RunRequest) -> Self {
        Self {
            document: request.document,
            raw_input: request.raw_input,
            password: request.password,
            environment: request.environment,
            flow: request.flow,
            business_id: request.business_id,
            device_id: request.device_id,
            ..Self::default()
        }
    }

    /// Enter the pipeline: set the entry status, progress 10 and the
    /// generation code from the document identification block.
    pub fn begin(&mut self, status: RunStatus) -> Result<(), TransitionError> {
        let patch = StatePatch {
            status: Some(status),
            progress: Some(10),
            generation_code: self.document.as_ref().map(|d| d.generation_code().clone()),
            ..StatePatch::default()
        };
        self.apply(patch)
    }

    pub fn generation_code(&self) -> Option<&GenerationCode> {
        self.generation_code.as_ref()
    }

    pub fn signature(&self) -> Option<&SignatureEnvelope> {
        self.signature.as_ref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn outcome(&self) -> RunOutcome {
        match self.status {
            RunStatus::Completed if self.is_offline => RunOutcome::Contingency,
            RunStatus::Completed => RunOutcome::Completed,
            RunStatus::Failed => RunOutcome::Failed,
            RunStatus::Contingency => RunOutcome::Contingency,
            RunStatus::Draft
            | RunStatus::Validating
            | RunStatus::Signing
            | RunStatus::Transmitting
            | RunStatus::ProcessingReception => RunOutcome::InProgress,
        }
    }

    /// Check a patch against the invariants without applying it.
    pub fn check(&self, patch: &StatePatch) -> Result<(), TransitionError> {
        if let Some(to) = patch.status {
            if !self.status.can_change_to(to) {
                return Err(TransitionError::InvalidStatusChange {
                    from: self.status,
                    to,
                });
            }
        }
        if let Some(attempted) = patch.retry_count {
            if attempted < self.retry_count || attempted > MAX_TRANSMIT_RETRIES {
                return Err(TransitionError::RetryCounter {
                    current: self.retry_count,
                    attempted,
                    limit: MAX_TRANSMIT_RETRIES,
                });
            }
        }
        if let (Some(assigned), Some(attempted)) = (&self.generation_code, &patch.generation_code) {
            if assigned != attempted {
                return Err(TransitionError::GenerationCodeChanged {
                    assigned: assigned.to_string(),
                    attempted: attempted.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Merge a patch. Either every field is applied or none is.
    pub fn apply(&mut self, patch: StatePatch) -> Result<(), TransitionError> {
        self.check(&patch)?;

        let StatePatch {
            status,
            document,
            signing,
            generation_code,
            is_valid,
            validation_errors,
            signature,
            is_transmitted,
            authority_response,
            is_offline,
            contingency_reason,
            retry_count,
            progress,
            current_step,
            estimated_seconds,
            error,
            retryable,
            tax_impact,
        } = patch;

        if let Some(v) = status {
            self.status = v;
        }
        if let Some(v) = document {
            self.document = Some(v);
        }
        if let Some(v) = signing {
            self.signing = Some(v);
        }
        if let Some(v) = generation_code {
            self.generation_code = Some(v);
        }
        if let Some(v) = is_valid {
            self.is_valid = v;
        }
        if let Some(v) = validation_errors {
            self.validation_errors = v;
        }
        if let Some(v) = signature {
            self.signature = v;
        }
        if let Some(v) = is_transmitted {
            self.is_transmitted = v;
        }
        if let Some(v) = authority_response {
            self.authority_response = Some(v);
        }
        if let Some(v) = is_offline {
            self.is_offline = v;
        }
        if let Some(v) = contingency_reason {
            self.contingency_reason = Some(v);
        }
        if let Some(v) = retry_count {
            self.retry_count = v;
        }
        if let Some(v) = progress {
            self.progress = v.min(100);
        }
        if let Some(v) = current_step {
            self.current_step = v;
        }
        if let Some(v) = estimated_seconds {
            self.estimated_seconds = v;
        }
        if let Some(v) = error {
            self.error = Some(v);
        }
        if let Some(v) = retryable {
            self.retryable = v;
        }
        if let Some(v) = tax_impact {
            self.tax_impact = Some(v);
        }
        Ok(())
    }
}

// ─── Patch ───────────────────────────────────────────────────────────

/// Partial update returned by a stage. `None` leaves a field unchanged.
///
/// `signature` is doubly optional: `Some(None)` clears the envelope, which
/// is how a stage that re-signs invalidates the previous one.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub status: Option<RunStatus>,
    pub document: Option<Dte>,
    pub signing: Option<SigningMaterial>,
    pub generation_code: Option<GenerationCode>,
    pub is_valid: Option<bool>,
    pub validation_errors: Option<Vec<String>>,
    pub signature: Option<Option<SignatureEnvelope>>,
    pub is_transmitted: Option<bool>,
    pub authority_response: Option<AuthorityResponse>,
    pub is_offline: Option<bool>,
    pub contingency_reason: Option<String>,
    pub retry_count: Option<u32>,
    pub progress: Option<u8>,
    pub current_step: Option<String>,
    pub estimated_seconds: Option<u32>,
    pub error: Option<RunError>,
    pub retryable: Option<bool>,
    pub tax_impact: Option<MonthlyAccumulator>,
}

impl StatePatch {
    /// A failure: status `failed`, the code's default retryable flag.
    pub fn failed(code: ErrorCode, message: impl Into<String>, progress: u8) -> Self {
        Self {
            status: Some(RunStatus::Failed),
            error: Some(RunError::new(code, message)),
            retryable: Some(code.retryable()),
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn with_validation_errors(mut self, errors: Vec<String>) -> Self {
        self.validation_errors = Some(errors);
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn with_signature(mut self, envelope: SignatureEnvelope) -> Self {
        self.signature = Some(Some(envelope));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::document::fixtures;

    fn request() -> RunRequest {
        RunRequest {
            document: Some(Dte::from_value(fixtures::voucher_json()).unwrap()),
            ..RunRequest::default()
        }
    }

    // -- Defaults ---------------------------------------------------------

    #[test]
    fn defaults_match_a_fresh_request() {
        let s = RunState::default();
        assert_eq!(s.status, RunStatus::Draft);
        assert_eq!(s.flow, FlowType::Emission);
        assert_eq!(s.environment, Environment::Sandbox);
        assert!(!s.is_valid && !s.is_signed() && !s.is_transmitted && !s.is_offline);
        assert_eq!(s.retry_count(), 0);
        assert_eq!(s.progress, 0);
        assert_eq!(s.current_step, "start");
        assert_eq!(s.estimated_seconds, 60);
        assert!(s.retryable);
    }

    #[test]
    fn begin_sets_progress_and_generation_code() {
        let mut s = RunState::from_request(request());
        s.begin(RunStatus::Validating).unwrap();
        assert_eq!(s.status, RunStatus::Validating);
        assert_eq!(s.progress, 10);
        assert_eq!(
            s.generation_code().map(|c| c.as_str()),
            Some("3F2504E0-4F89-41D3-9A0C-0305E82C3301")
        );
    }

    // -- Invariants -------------------------------------------------------

    #[test]
    fn status_cannot_move_backwards() {
        let mut s = RunState::from_request(request());
        s.begin(RunStatus::Validating).unwrap();
        s.apply(StatePatch {
            status: Some(RunStatus::Signing),
            ..StatePatch::default()
        })
        .unwrap();
        let err = s
            .apply(StatePatch {
                status: Some(RunStatus::Validating),
                progress: Some(99),
                ..StatePatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidStatusChange { .. }));
        assert_eq!(s.status, RunStatus::Signing);
        assert_eq!(s.progress, 10, "rejected patch must not partially apply");
    }

    #[test]
    fn terminal_statuses_are_final() {
        for terminal in [RunStatus::Completed, RunStatus::Failed] {
            assert!(terminal.is_terminal());
            for next in [RunStatus::Validating, RunStatus::Contingency, RunStatus::Transmitting] {
                assert!(!terminal.can_change_to(next));
            }
        }
    }

    #[test]
    fn retry_counter_is_capped() {
        let mut s = RunState::default();
        for n in 1..=MAX_TRANSMIT_RETRIES {
            s.apply(StatePatch {
                retry_count: Some(n),
                ..StatePatch::default()
            })
            .unwrap();
        }
        let err = s
            .apply(StatePatch {
                retry_count: Some(MAX_TRANSMIT_RETRIES + 1),
                ..StatePatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, TransitionError::RetryCounter { .. }));
        assert_eq!(s.retry_count(), MAX_TRANSMIT_RETRIES);
    }

    #[test]
    fn generation_code_is_immutable() {
        let mut s = RunState::from_request(request());
        s.begin(RunStatus::Validating).unwrap();
        let other = GenerationCode::new("11111111-2222-4333-8444-555555555555").unwrap();
        let err = s
            .apply(StatePatch {
                generation_code: Some(other),
                ..StatePatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, TransitionError::GenerationCodeChanged { .. }));
    }

    #[test]
    fn signature_tracks_is_signed() {
        let mut s = RunState::default();
        s.apply(StatePatch::default().with_signature(SignatureEnvelope::new("a.b.c")))
            .unwrap();
        assert!(s.is_signed());
        s.apply(StatePatch {
            signature: Some(None),
            ..StatePatch::default()
        })
        .unwrap();
        assert!(!s.is_signed());
    }

    // -- Outcome ----------------------------------------------------------

    #[test]
    fn offline_completion_is_a_contingency_outcome() {
        let mut s = RunState::default();
        s.status = RunStatus::Completed;
        assert_eq!(s.outcome(), RunOutcome::Completed);
        s.is_offline = true;
        assert_eq!(s.outcome(), RunOutcome::Contingency);
        s.status = RunStatus::Transmitting;
        assert_eq!(s.outcome(), RunOutcome::InProgress);
    }

    #[test]
    fn failed_patch_uses_code_defaults() {
        let p = StatePatch::failed(ErrorCode::SignInactiveLicense, "Licencia inactiva", 30);
        assert_eq!(p.status, Some(RunStatus::Failed));
        assert_eq!(p.retryable, Some(false));
        assert_eq!(p.progress, Some(30));
    }

    // -- Inputs -----------------------------------------------------------

    #[test]
    fn raw_payload_parses_text_and_json() {
        let text = RawPayload::Text(fixtures::voucher_json().to_string());
        assert!(text.to_document().is_ok());
        let json = RawPayload::Json(fixtures::voucher_json());
        assert!(json.to_document().is_ok());
        assert!(RawPayload::Text("{not json".into()).to_document().is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let m = SigningMaterial {
            nit: "06140101901013".into(),
            password: Secret::new("hunter2"),
            api_token: Some(Secret::new("tok")),
        };
        let out = format!("{m:?}");
        assert!(!out.contains("hunter2") && !out.contains("\"tok\""));
        let mut r = request();
        r.password = Some(Secret::new("hunter2"));
        assert!(!format!("{r:?}").contains("hunter2"));
    }
}
