//! Totals across a set of monthly accumulators, typically one business's
//! months of a year.

use serde::{Deserialize, Serialize};

use dte_core::{Amount, PeriodKey};

use crate::accumulator::MonthlyAccumulator;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// Periods covered, ascending.
    pub periods: Vec<PeriodKey>,
    pub document_count: u64,
    pub operations_total: Amount,
    pub gross_taxed: Amount,
    pub tax: Amount,
    pub vat_withheld: Amount,
    pub income_withheld: Amount,
}

impl MonthlySummary {
    pub fn from_accumulators<'a>(accumulators: impl IntoIterator<Item = &'a MonthlyAccumulator>) -> Self {
        let mut summary = Self::default();
        for acc in accumulators {
            summary.periods.push(acc.period);
            summary.document_count += acc.document_count;
            summary.operations_total += acc.operations_total;
            summary.gross_taxed += acc.gross_taxed;
            summary.tax += acc.tax;
            summary.vat_withheld += acc.vat_withheld;
            summary.income_withheld += acc.income_withheld;
        }
        summary.periods.sort();
        summary.periods.dedup();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dte_core::BusinessId;

    fn acc(month: u32, docs: u64, tax_cents: i64) -> MonthlyAccumulator {
        let mut a = MonthlyAccumulator::empty(
            BusinessId::new("06140101901013").unwrap(),
            PeriodKey::new(2024, month).unwrap(),
            Utc.with_ymd_and_hms(2024, month, 2, 0, 0, 0).unwrap(),
        );
        a.document_count = docs;
        a.tax = Amount::from_cents(tax_cents);
        a.operations_total = Amount::from_cents(tax_cents * 10);
        a
    }

    #[test]
    fn sums_across_months() {
        let accs = [acc(3, 2, 130), acc(1, 5, 260)];
        let s = MonthlySummary::from_accumulators(&accs);
        assert_eq!(s.document_count, 7);
        assert_eq!(s.tax, Amount::from_cents(390));
        assert_eq!(s.operations_total, Amount::from_cents(3900));
        assert_eq!(
            s.periods,
            vec![PeriodKey::new(2024, 1).unwrap(), PeriodKey::new(2024, 3).unwrap()]
        );
    }

    #[test]
    fn empty_set_is_zero() {
        let s = MonthlySummary::from_accumulators(std::iter::empty());
        assert_eq!(s, MonthlySummary::default());
    }
}
