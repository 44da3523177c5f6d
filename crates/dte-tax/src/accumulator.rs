//! # Monthly Accumulator
//!
//! One running total per (business, period, scope). Issued documents add
//! their amounts (debit); received credit-eligible documents subtract them
//! (credit); received withholding vouchers add to VAT withheld.
//!
//! ## Idempotency
//!
//! The accumulator keeps the generation codes it has applied. Applying
//! the same document twice is a no-op that reports
//! [`ApplyOutcome::AlreadyApplied`], so at-least-once redelivery of a run
//! cannot double count.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dte_core::{Amount, BusinessId, Dte, FlowType, GenerationCode, PeriodKey};

/// Scope for the all-documents accumulator.
pub const SCOPE_ALL: &str = "ALL";

/// Errors applying a document to an accumulator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccumulatorError {
    /// Document emission date falls outside the accumulator's period.
    #[error("document period {found} does not match accumulator period {expected}")]
    PeriodMismatch {
        /// Accumulator period.
        expected: PeriodKey,
        /// Period of the document's emission date.
        found: PeriodKey,
    },
}

/// Result of [`MonthlyAccumulator::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
}

/// Per-key running totals. Amounts are fixed-point cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAccumulator {
    pub business_id: BusinessId,
    pub period: PeriodKey,
    pub scope: String,
    pub gross_taxed: Amount,
    pub exempt: Amount,
    pub non_subject: Amount,
    /// VAT (IVA) debit minus credit.
    pub tax: Amount,
    pub vat_withheld: Amount,
    pub income_withheld: Amount,
    /// Sum of taxed, exempt and non-subject sales issued.
    pub operations_total: Amount,
    pub document_count: u64,
    pub updated_at: DateTime<Utc>,
    /// Generation codes already applied.
    #[serde(default)]
    pub applied: BTreeSet<GenerationCode>,
}

impl MonthlyAccumulator {
    /// A zeroed accumulator for the `ALL` scope.
    pub fn empty(business_id: BusinessId, period: PeriodKey, now: DateTime<Utc>) -> Self {
        Self {
            business_id,
            period,
            scope: SCOPE_ALL.to_string(),
            gross_taxed: Amount::ZERO,
            exempt: Amount::ZERO,
            non_subject: Amount::ZERO,
            tax: Amount::ZERO,
            vat_withheld: Amount::ZERO,
            income_withheld: Amount::ZERO,
            operations_total: Amount::ZERO,
            document_count: 0,
            updated_at: now,
            applied: BTreeSet::new(),
        }
    }

    pub fn has_applied(&self, code: &GenerationCode) -> bool {
        self.applied.contains(code)
    }

    /// Apply a document's fiscal amounts.
    pub fn apply(
        &mut self,
        dte: &Dte,
        flow: FlowType,
        now: DateTime<Utc>,
    ) -> Result<ApplyOutcome, AccumulatorError> {
        let found = PeriodKey::from_date(dte.identification.emission_date);
        if found != self.period {
            return Err(AccumulatorError::PeriodMismatch {
                expected: self.period,
                found,
            });
        }
        if self.has_applied(dte.generation_code()) {
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let s = &dte.summary;
        match flow {
            FlowType::Emission => {
                let taxed = s.taxed_amount();
                let exempt = s.exempt_amount();
                let non_subject = s.non_subject_amount();
                self.gross_taxed += taxed;
                self.exempt += exempt;
                self.non_subject += non_subject;
                self.tax += s.tax_amount();
                self.income_withheld += s.income_withheld_amount();
                self.operations_total += taxed + exempt + non_subject;
            }
            FlowType::Reception => {
                let doc_type = dte.document_type();
                if doc_type.is_credit_eligible() {
                    self.gross_taxed -= s.taxed_amount();
                    self.exempt -= s.exempt_amount();
                    self.non_subject -= s.non_subject_amount();
                    self.tax -= s.tax_amount();
                } else if doc_type.is_withholding() {
                    self.vat_withheld += s.withheld_vat_amount();
                }
            }
        }

        self.document_count += 1;
        self.applied.insert(dte.generation_code().clone());
        self.updated_at = now;
        Ok(ApplyOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dte_core::document::fixtures;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap()
    }

    fn voucher() -> Dte {
        Dte::from_value(fixtures::voucher_json()).unwrap()
    }

    fn empty() -> MonthlyAccumulator {
        MonthlyAccumulator::empty(
            BusinessId::new("06140101901013").unwrap(),
            PeriodKey::new(2024, 1).unwrap(),
            now(),
        )
    }

    // -- Emission ---------------------------------------------------------

    #[test]
    fn emission_from_empty() {
        let mut acc = empty();
        let outcome = acc.apply(&voucher(), FlowType::Emission, now()).unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(acc.gross_taxed, Amount::from_cents(1000));
        assert_eq!(acc.tax, Amount::from_cents(130));
        assert_eq!(acc.operations_total, Amount::from_cents(1000));
        assert_eq!(acc.document_count, 1);
        assert_eq!(acc.scope, SCOPE_ALL);
    }

    #[test]
    fn emission_falls_back_to_total_iva() {
        let mut raw = fixtures::voucher_json();
        raw["resumen"]["tributos"] = serde_json::Value::Null;
        raw["resumen"]["totalIva"] = serde_json::json!(0.75);
        let dte = Dte::from_value(raw).unwrap();
        let mut acc = empty();
        acc.apply(&dte, FlowType::Emission, now()).unwrap();
        assert_eq!(acc.tax, Amount::from_cents(75));
    }

    #[test]
    fn duplicate_application_is_ignored() {
        let mut acc = empty();
        acc.apply(&voucher(), FlowType::Emission, now()).unwrap();
        let outcome = acc.apply(&voucher(), FlowType::Emission, now()).unwrap();
        assert_eq!(outcome, ApplyOutcome::AlreadyApplied);
        assert_eq!(acc.document_count, 1);
        assert_eq!(acc.gross_taxed, Amount::from_cents(1000));
    }

    #[test]
    fn period_mismatch_is_rejected() {
        let mut acc = MonthlyAccumulator::empty(
            BusinessId::new("06140101901013").unwrap(),
            PeriodKey::new(2024, 2).unwrap(),
            now(),
        );
        let err = acc.apply(&voucher(), FlowType::Emission, now()).unwrap_err();
        assert!(matches!(err, AccumulatorError::PeriodMismatch { .. }));
        assert_eq!(acc.document_count, 0);
    }

    // -- Reception --------------------------------------------------------

    #[test]
    fn credit_eligible_reception_subtracts() {
        let mut acc = empty();
        acc.apply(&voucher(), FlowType::Reception, now()).unwrap();
        assert_eq!(acc.gross_taxed, Amount::from_cents(-1000));
        assert_eq!(acc.tax, Amount::from_cents(-130));
        assert_eq!(acc.operations_total, Amount::ZERO);
        assert_eq!(acc.document_count, 1);
    }

    #[test]
    fn withholding_reception_adds_vat_withheld() {
        let dte = Dte::from_value(fixtures::withholding_json()).unwrap();
        let mut acc = empty();
        acc.apply(&dte, FlowType::Reception, now()).unwrap();
        assert_eq!(acc.vat_withheld, Amount::from_cents(100));
        assert_eq!(acc.gross_taxed, Amount::ZERO);
        assert_eq!(acc.document_count, 1);
    }

    #[test]
    fn non_credit_reception_only_counts() {
        let mut raw = fixtures::voucher_json();
        raw["identificacion"]["tipoDte"] = serde_json::json!("01");
        let dte = Dte::from_value(raw).unwrap();
        let mut acc = empty();
        acc.apply(&dte, FlowType::Reception, now()).unwrap();
        assert_eq!(acc.gross_taxed, Amount::ZERO);
        assert_eq!(acc.tax, Amount::ZERO);
        assert_eq!(acc.document_count, 1);
    }

    #[test]
    fn serde_round_trip_keeps_ledger() {
        let mut acc = empty();
        acc.apply(&voucher(), FlowType::Emission, now()).unwrap();
        let json = serde_json::to_string(&acc).unwrap();
        let back: MonthlyAccumulator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, acc);
        assert!(back.has_applied(voucher().generation_code()));
    }

    // -- Algebra ----------------------------------------------------------

    fn with_amounts(code: &str, taxed_cents: i64, vat_cents: i64) -> Dte {
        let mut raw = fixtures::voucher_json();
        raw["identificacion"]["codigoGeneracion"] = serde_json::json!(code);
        raw["resumen"]["totalGravada"] = serde_json::json!(taxed_cents as f64 / 100.0);
        raw["resumen"]["tributos"][0]["valor"] = serde_json::json!(vat_cents as f64 / 100.0);
        Dte::from_value(raw).unwrap()
    }

    proptest! {
        #[test]
        fn emission_adds_and_reception_subtracts(
            taxed in 0i64..10_000_000,
            vat in 0i64..1_000_000,
            prior_taxed in -10_000_000i64..10_000_000,
        ) {
            let mut acc = empty();
            acc.gross_taxed = Amount::from_cents(prior_taxed);

            let issued = with_amounts("11111111-2222-4333-8444-555555555555", taxed, vat);
            acc.apply(&issued, FlowType::Emission, now()).unwrap();
            prop_assert_eq!(acc.gross_taxed, Amount::from_cents(prior_taxed + taxed));
            prop_assert_eq!(acc.tax, Amount::from_cents(vat));

            let received = with_amounts("66666666-7777-4888-9999-AAAAAAAAAAAA", taxed, vat);
            acc.apply(&received, FlowType::Reception, now()).unwrap();
            prop_assert_eq!(acc.gross_taxed, Amount::from_cents(prior_taxed));
            prop_assert_eq!(acc.tax, Amount::ZERO);
            prop_assert_eq!(acc.document_count, 2);
        }
    }
}
