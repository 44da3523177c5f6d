//! # Fixed-Point Amounts
//!
//! Fiscal documents carry amounts as JSON numbers. Arithmetic on them
//! (line-item reconciliation, monthly accumulation) happens in integer cents
//! through [`Amount`] so that repeated sums never drift.
//!
//! [`round_half_up`] reproduces the authority's rounding: half away from
//! zero after nudging by one ulp-scale epsilon, so `1.005` rounds to `1.01`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Decimal places for monetary fields.
pub const MONEY_DECIMALS: u32 = 2;

/// Decimal places for quantities and unit prices.
pub const QUANTITY_DECIMALS: u32 = 8;

/// Round `value` half-up to `decimals` places.
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let nudge = f64::EPSILON * value.abs().max(1.0);
    let nudged = if value < 0.0 { value - nudge } else { value + nudge };
    (nudged * factor).round() / factor
}

/// A monetary amount in integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Convert a document number, rounding half-up to cents.
    ///
    /// Non-finite input maps to zero.
    pub fn from_decimal(value: f64) -> Self {
        if !value.is_finite() {
            return Self::ZERO;
        }
        Self((round_half_up(value, MONEY_DECIMALS) * 100.0).round() as i64)
    }

    /// Back to a document number.
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parse `"1234.56"`, `"-0.5"` or `"10"`. Extra fraction digits are truncated.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let negative = s.starts_with('-');
        let unsigned = s.trim_start_matches(['-', '+']);
        let (whole, frac) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };
        if (whole.is_empty() && frac.is_empty()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().ok()? * 10,
            _ => frac[..2].parse().ok()?,
        };
        let cents = whole.checked_mul(100)?.checked_add(frac_cents)?;
        Some(Self(if negative { -cents } else { cents }))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// `|self - other|` is at most `tolerance`.
    pub fn within(&self, other: Amount, tolerance: Amount) -> bool {
        (self.0 - other.0).abs() <= tolerance.0
    }

    /// Multiply by a rate given in basis points, rounding half-up to cents.
    pub fn apply_bps(&self, bps: i64) -> Self {
        let scaled = self.0 as i128 * bps as i128;
        let rounded = if scaled >= 0 {
            (scaled + 5_000) / 10_000
        } else {
            (scaled - 5_000) / 10_000
        };
        Self(rounded as i64)
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::str::FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::InvalidAmount(s.to_string()))
    }
}

/// Serialized as a two-decimal string so stored totals never pass through floats.
impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(Amount::from_decimal(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // -- round_half_up ---

    #[test]
    fn rounds_half_up_on_binary_edge_cases() {
        assert_eq!(round_half_up(1.005, 2), 1.01);
        assert_eq!(round_half_up(2.675, 2), 2.68);
        assert_eq!(round_half_up(1.1000000000000001, 2), 1.1);
        assert_eq!(round_half_up(-1.005, 2), -1.01);
    }

    #[test]
    fn rounds_quantities_to_eight_places() {
        assert_eq!(round_half_up(0.123456789, QUANTITY_DECIMALS), 0.12345679);
    }

    // -- Amount ---

    #[test]
    fn from_decimal_rounds_to_cents() {
        assert_eq!(Amount::from_decimal(1.3).cents(), 130);
        assert_eq!(Amount::from_decimal(10.0).cents(), 1000);
        assert_eq!(Amount::from_decimal(0.125).cents(), 13);
        assert_eq!(Amount::from_decimal(f64::NAN), Amount::ZERO);
    }

    #[test]
    fn parse_accepts_common_forms() {
        assert_eq!(Amount::parse("100.50"), Some(Amount::from_cents(10050)));
        assert_eq!(Amount::parse("10"), Some(Amount::from_cents(1000)));
        assert_eq!(Amount::parse("0.1"), Some(Amount::from_cents(10)));
        assert_eq!(Amount::parse("-0.50"), Some(Amount::from_cents(-50)));
        assert_eq!(Amount::parse(""), None);
        assert_eq!(Amount::parse("abc"), None);
        assert_eq!(Amount::parse("1.x"), None);
    }

    #[test]
    fn display_pads_cents() {
        assert_eq!(Amount::from_cents(450).to_string(), "4.50");
        assert_eq!(Amount::from_cents(1).to_string(), "0.01");
        assert_eq!(Amount::from_cents(-5).to_string(), "-0.05");
    }

    #[test]
    fn serde_uses_strings_and_accepts_numbers() {
        let json = serde_json::to_string(&Amount::from_cents(130)).expect("serialize");
        assert_eq!(json, "\"1.30\"");
        let from_number: Amount = serde_json::from_str("1.3").expect("number");
        assert_eq!(from_number, Amount::from_cents(130));
        let from_text: Amount = serde_json::from_str("\"1.30\"").expect("text");
        assert_eq!(from_text, Amount::from_cents(130));
    }

    #[test]
    fn within_tolerance() {
        let a = Amount::from_cents(1000);
        assert!(a.within(Amount::from_cents(1001), Amount::from_cents(1)));
        assert!(!a.within(Amount::from_cents(1002), Amount::from_cents(1)));
    }

    #[test]
    fn apply_bps_rounds_half_up() {
        assert_eq!(Amount::from_cents(13_000).apply_bps(100), Amount::from_cents(130));
        assert_eq!(Amount::from_cents(150).apply_bps(100), Amount::from_cents(2));
        assert_eq!(Amount::from_cents(149).apply_bps(100), Amount::from_cents(1));
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(cents in -10_000_000_000i64..10_000_000_000i64) {
            let a = Amount::from_cents(cents);
            prop_assert_eq!(Amount::parse(&a.to_string()), Some(a));
        }

        #[test]
        fn add_then_sub_restores(a in -1_000_000_000i64..1_000_000_000i64, b in -1_000_000_000i64..1_000_000_000i64) {
            let x = Amount::from_cents(a);
            let y = Amount::from_cents(b);
            prop_assert_eq!((x + y) - y, x);
        }
    }
}
