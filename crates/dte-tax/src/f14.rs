//! # F14 Advance Payment
//!
//! Monthly advance income-tax payment (pago a cuenta, form F14): 1% of the
//! period's VAT amount, due four days before the end of the following
//! month.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use dte_core::{Amount, PeriodKey};

/// F14 rate in basis points (1%).
pub const F14_RATE_BPS: i64 = 100;

/// Days before the end of the following month the payment is due.
pub const F14_DUE_DAYS_BEFORE_MONTH_END: i64 = 4;

/// Filing state of an F14 computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum F14State {
    /// A positive amount is due.
    Pendiente,
    /// Nothing is due for the period.
    NoAplica,
}

impl F14State {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "PENDIENTE",
            Self::NoAplica => "NO_APLICA",
        }
    }
}

impl std::fmt::Display for F14State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct F14Computation {
    pub period: PeriodKey,
    pub vat_base: Amount,
    pub amount: Amount,
    pub state: F14State,
    pub due_date: NaiveDate,
}

/// Due date for a period: last day of the next month minus four days.
pub fn f14_due_date(period: PeriodKey) -> NaiveDate {
    period.next().last_day() - Duration::days(F14_DUE_DAYS_BEFORE_MONTH_END)
}

/// Compute the F14 payment for a period's VAT amount.
pub fn compute_f14(period: PeriodKey, vat: Amount) -> F14Computation {
    let amount = vat.apply_bps(F14_RATE_BPS);
    let state = if amount.is_positive() {
        F14State::Pendiente
    } else {
        F14State::NoAplica
    };
    F14Computation {
        period,
        vat_base: vat,
        amount,
        state,
        due_date: f14_due_date(period),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(y: i32, m: u32) -> PeriodKey {
        PeriodKey::new(y, m).unwrap()
    }

    #[test]
    fn one_percent_rounded_half_up() {
        let c = compute_f14(period(2024, 1), Amount::from_cents(12_350));
        assert_eq!(c.amount, Amount::from_cents(124));
        assert_eq!(c.state, F14State::Pendiente);
    }

    #[test]
    fn zero_and_negative_do_not_apply() {
        assert_eq!(compute_f14(period(2024, 1), Amount::ZERO).state, F14State::NoAplica);
        let credit = compute_f14(period(2024, 1), Amount::from_cents(-5_000));
        assert_eq!(credit.state, F14State::NoAplica);
    }

    #[test]
    fn small_vat_rounds_to_zero() {
        let c = compute_f14(period(2024, 1), Amount::from_cents(49));
        assert_eq!(c.amount, Amount::ZERO);
        assert_eq!(c.state, F14State::NoAplica);
    }

    #[test]
    fn due_dates() {
        assert_eq!(
            f14_due_date(period(2024, 1)),
            NaiveDate::from_ymd_opt(2024, 2, 25).unwrap()
        );
        assert_eq!(
            f14_due_date(period(2024, 12)),
            NaiveDate::from_ymd_opt(2025, 1, 27).unwrap()
        );
        assert_eq!(
            f14_due_date(period(2023, 3)),
            NaiveDate::from_ymd_opt(2023, 4, 26).unwrap()
        );
    }

    #[test]
    fn state_serializes_upper_snake() {
        assert_eq!(serde_json::to_string(&F14State::NoAplica).unwrap(), "\"NO_APLICA\"");
    }
}
