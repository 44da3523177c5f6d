//! # Temporal Types
//!
//! Documents carry their emission date and time in El Salvador local time
//! (UTC−6, no daylight saving). Monthly bookkeeping keys off the emission
//! date as a [`PeriodKey`] (`YYYY-MM`).
//!
//! Time is read through the [`Clock`] trait so that contingency stamping
//! and deadlines are deterministic under test.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Hours El Salvador local time lags UTC.
pub const EL_SALVADOR_UTC_LAG_HOURS: i64 = 6;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Convert an instant to El Salvador local time, truncated to seconds.
pub fn el_salvador_local(instant: DateTime<Utc>) -> NaiveDateTime {
    let local = instant.naive_utc() - Duration::hours(EL_SALVADOR_UTC_LAG_HOURS);
    local.with_nanosecond(0).unwrap_or(local)
}

/// Emission date and time as written into `fecEmi` / `horEmi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EmissionStamp {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl EmissionStamp {
    /// Local emission stamp for a UTC instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        let local = el_salvador_local(instant);
        Self {
            date: local.date(),
            time: local.time(),
        }
    }

    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    /// The stamp one second later, rolling over midnight.
    pub fn next_second(&self) -> Self {
        let next = self.date.and_time(self.time) + Duration::seconds(1);
        Self {
            date: next.date(),
            time: next.time(),
        }
    }
}

/// Fiscal period, one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPeriod`] for a month outside 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(ValidationError::InvalidPeriod(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// Period containing a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse `YYYY-MM`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidPeriod(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(invalid());
        }
        let year = y.parse().map_err(|_| invalid())?;
        let month = m.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for PeriodKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn local_time_is_six_hours_behind_utc() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 3, 15, 9).single().expect("valid");
        let stamp = EmissionStamp::at(utc);
        assert_eq!(stamp.date, NaiveDate::from_ymd_opt(2024, 2, 29).expect("date"));
        assert_eq!(stamp.time, NaiveTime::from_hms_opt(21, 15, 9).expect("time"));
    }

    #[test]
    fn next_second_rolls_over_midnight() {
        let stamp = EmissionStamp::new(
            NaiveDate::from_ymd_opt(2024, 12, 31).expect("date"),
            NaiveTime::from_hms_opt(23, 59, 59).expect("time"),
        );
        let next = stamp.next_second();
        assert_eq!(next.date, NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"));
        assert_eq!(next.time, NaiveTime::from_hms_opt(0, 0, 0).expect("time"));
    }

    #[test]
    fn period_key_parse_and_display() {
        let key = PeriodKey::parse("2024-01").expect("parse");
        assert_eq!(key.to_string(), "2024-01");
        assert_eq!(key.year(), 2024);
        assert!(PeriodKey::parse("2024-1").is_err());
        assert!(PeriodKey::parse("2024-13").is_err());
        assert!(PeriodKey::parse("abcd-01").is_err());
    }

    #[test]
    fn period_key_from_emission_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).expect("date");
        assert_eq!(PeriodKey::from_date(date).to_string(), "2024-01");
    }

    #[test]
    fn period_boundaries() {
        let feb = PeriodKey::new(2024, 2).expect("period");
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).expect("date"));
        let dec = PeriodKey::new(2024, 12).expect("period");
        assert_eq!(dec.next().to_string(), "2025-01");
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2024, 12, 31).expect("date"));
    }

    #[test]
    fn period_key_serde_as_string() {
        let key = PeriodKey::new(2024, 7).expect("period");
        assert_eq!(serde_json::to_string(&key).expect("ser"), "\"2024-07\"");
        let back: PeriodKey = serde_json::from_str("\"2024-07\"").expect("de");
        assert_eq!(back, key);
    }

    #[test]
    fn fixed_clock_is_frozen() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid");
        let clock = FixedClock(t);
        assert_eq!(clock.now(), clock.now());
    }
}
