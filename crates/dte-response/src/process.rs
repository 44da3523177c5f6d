//! Splitting an authority response into mapped errors, warnings and the
//! observations marker.

use serde::{Deserialize, Serialize};

use dte_core::AuthorityResponse;

use crate::catalog::{self, ErrorDescriptor, Severity};

/// An authority response with every coded message mapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedResponse {
    pub success: bool,
    /// Error-severity descriptors, in the authority's order.
    pub errors: Vec<ErrorDescriptor>,
    pub warnings: Vec<ErrorDescriptor>,
    /// Present when the authority accepted with observations.
    pub observations: Option<ErrorDescriptor>,
}

impl ProcessedResponse {
    /// The descriptor that best explains a failure.
    pub fn primary_error(&self) -> Option<&ErrorDescriptor> {
        self.errors.first()
    }
}

pub fn process_authority_response(response: &AuthorityResponse) -> ProcessedResponse {
    if response.success {
        return ProcessedResponse {
            success: true,
            observations: response
                .has_observations()
                .then(|| catalog::map_authority_code("002")),
            ..ProcessedResponse::default()
        };
    }

    let mut out = ProcessedResponse::default();
    for message in &response.errors {
        let descriptor = catalog::map_authority_code(&message.code);
        match descriptor.severity {
            Severity::Error => out.errors.push(descriptor),
            Severity::Warning => out.warnings.push(descriptor),
            Severity::Success => out.observations = Some(descriptor),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::{AuthorityMessage, AuthorityStatus};

    #[test]
    fn accepted_response_has_nothing_to_report() {
        let p = process_authority_response(&AuthorityResponse::accepted("S", "T"));
        assert!(p.success);
        assert!(p.errors.is_empty());
        assert!(p.observations.is_none());
    }

    #[test]
    fn observations_are_flagged_on_acceptance() {
        let mut r = AuthorityResponse::accepted("S", "T");
        r.status = Some(AuthorityStatus::ReceivedWithObservations);
        let p = process_authority_response(&r);
        assert!(p.success);
        assert_eq!(
            p.observations.map(|d| d.code),
            Some(catalog::OBSERVATIONS_CODE.to_string())
        );
    }

    #[test]
    fn rejection_splits_by_severity() {
        let r = AuthorityResponse::rejected(vec![
            AuthorityMessage::new("018", "fuera de plazo"),
            AuthorityMessage::new("020", "calculo"),
            AuthorityMessage::new("002", "observaciones"),
            AuthorityMessage::new("777", "???"),
        ]);
        let p = process_authority_response(&r);
        assert!(!p.success);
        let codes: Vec<_> = p.errors.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, ["MH_CALCULATION_INCORRECT", "MH_UNKNOWN_ERROR"]);
        assert_eq!(p.warnings.len(), 1);
        assert!(p.observations.is_some());
        assert_eq!(p.primary_error().unwrap().code, "MH_CALCULATION_INCORRECT");
    }
}
