//! # dte-tax — Fiscal Bookkeeping
//!
//! Monthly running totals per business, the F14 advance-payment
//! computation derived from them, and multi-month summaries.
//!
//! Persistence is not handled here; `dte-store` keeps accumulators and
//! the pipeline's tax stage loads, applies and upserts them.

pub mod accumulator;
pub mod f14;
pub mod summary;

pub use accumulator::{AccumulatorError, ApplyOutcome, MonthlyAccumulator, SCOPE_ALL};
pub use f14::{compute_f14, f14_due_date, F14Computation, F14State, F14_RATE_BPS};
pub use summary::MonthlySummary;
