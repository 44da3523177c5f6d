//! # dte-schema — Document Validation
//!
//! Judges whether a document may be signed. Validation runs in four steps
//! and reports every problem found up to the first step that fails:
//!
//! 1. JSON Schema conformance of the raw payload ([`validate`]).
//! 2. Decoding into the typed [`Dte`] model.
//! 3. Amount normalization ([`normalize`]).
//! 4. Numeric reconciliation of declared totals ([`rules`]).
//!
//! A successful report carries the normalized document, which is what the
//! signer receives.

pub mod normalize;
pub mod rules;
pub mod validate;

use serde_json::Value;

use dte_core::Dte;

pub use rules::{is_sales_shaped, reconcile, TOLERANCE};
pub use validate::{DocumentSchema, FieldViolation, SchemaError, DOCUMENT_SCHEMA};

/// Outcome of validating one document.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Violations found, empty when valid.
    pub violations: Vec<FieldViolation>,
    /// The normalized document, present only when valid.
    pub document: Option<Dte>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty() && self.document.is_some()
    }

    /// Violations rendered as `"<field>: <description>"`.
    pub fn error_strings(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Schema plus business-rule validator.
#[derive(Debug)]
pub struct DocumentValidator {
    schema: DocumentSchema,
}

impl DocumentValidator {
    /// Build a validator around the embedded schema.
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            schema: DocumentSchema::embedded()?,
        })
    }

    pub fn with_schema(schema: DocumentSchema) -> Self {
        Self { schema }
    }

    /// Validate a raw payload.
    pub fn validate_value(&self, value: &Value) -> ValidationReport {
        let violations = self.schema.violations(value);
        if !violations.is_empty() {
            tracing::debug!(count = violations.len(), "document failed schema validation");
            return ValidationReport {
                violations,
                document: None,
            };
        }

        let mut dte = match Dte::from_value(value.clone()) {
            Ok(dte) => dte,
            Err(e) => {
                return ValidationReport {
                    violations: vec![FieldViolation::new(
                        "DECODE-0001",
                        "documento",
                        e.to_string(),
                    )],
                    document: None,
                }
            }
        };

        normalize::normalize(&mut dte);

        let violations = rules::reconcile(&dte);
        if !violations.is_empty() {
            tracing::debug!(
                generation_code = %dte.generation_code(),
                count = violations.len(),
                "document totals do not reconcile"
            );
            return ValidationReport {
                violations,
                document: None,
            };
        }

        ValidationReport {
            violations: Vec::new(),
            document: Some(dte),
        }
    }

    /// Validate an already-typed document by its encoded form.
    pub fn validate_document(&self, dte: &Dte) -> ValidationReport {
        match dte.to_value() {
            Ok(value) => self.validate_value(&value),
            Err(e) => ValidationReport {
                violations: vec![FieldViolation::new(
                    "DECODE-0001",
                    "documento",
                    e.to_string(),
                )],
                document: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::document::fixtures;
    use serde_json::json;

    fn validator() -> DocumentValidator {
        DocumentValidator::new().expect("validator builds")
    }

    #[test]
    fn valid_document_yields_normalized_copy() {
        let mut raw = fixtures::voucher_json();
        raw["cuerpoDocumento"][0]["precioUni"] = json!(10.000000001);
        let report = validator().validate_value(&raw);
        assert!(report.is_valid(), "{:?}", report.error_strings());
        let doc = report.document.expect("document");
        assert_eq!(doc.items[0].unit_price, Some(10.0));
    }

    #[test]
    fn schema_errors_stop_before_rules() {
        let mut raw = fixtures::voucher_json();
        raw["identificacion"]["tipoMoneda"] = json!("EUR");
        raw["resumen"]["totalGravada"] = json!(99);
        let report = validator().validate_value(&raw);
        assert!(!report.is_valid());
        assert!(report
            .error_strings()
            .iter()
            .all(|e| !e.starts_with("resumen.totalGravada")));
        assert!(report
            .error_strings()
            .iter()
            .any(|e| e.starts_with("identificacion.tipoMoneda: ")));
    }

    #[test]
    fn decode_errors_are_reported() {
        let mut raw = fixtures::voucher_json();
        raw["identificacion"]["fecEmi"] = json!("2024-02-31");
        let report = validator().validate_value(&raw);
        assert!(!report.is_valid());
        assert!(report.error_strings()[0].starts_with("documento: "));
    }

    #[test]
    fn reconciliation_errors_are_reported() {
        let mut raw = fixtures::voucher_json();
        raw["resumen"]["totalPagar"] = json!(12.5);
        let report = validator().validate_value(&raw);
        assert_eq!(
            report.error_strings().len(),
            1,
            "{:?}",
            report.error_strings()
        );
        assert!(report.error_strings()[0].starts_with("resumen.totalPagar: "));
    }

    #[test]
    fn typed_document_round_trip_validates() {
        let dte = Dte::from_value(fixtures::voucher_json()).expect("decode");
        assert!(validator().validate_document(&dte).is_valid());
    }
}
